//! Paging, limits and keyword search shared by the list endpoints.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Rows returned by an option list when the caller names no limit.
pub const DEFAULT_LIMIT: usize = 300;
/// Hard ceiling on an option list, also used for "everything" (`-1`).
pub const MAX_LIMIT: usize = 10_000;
/// Limit value asking for every row (still capped at [`MAX_LIMIT`]).
pub const UNLIMITED: i64 = -1;

pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// 1-based page request. `page` and `page_size` of 0 fall back to 1 and
/// [`DEFAULT_PAGE_SIZE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 1, page_size: DEFAULT_PAGE_SIZE }
    }
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size }
    }

    fn offset_and_size(self) -> (usize, usize) {
        let size = if self.page_size == 0 { DEFAULT_PAGE_SIZE } else { self.page_size } as usize;
        let page = self.page.max(1) as usize;
        ((page - 1).saturating_mul(size), size)
    }

    /// Cut one page out of already filtered and ordered rows.
    pub fn slice<T>(self, rows: Vec<T>) -> Page<T> {
        let total = rows.len() as u64;
        let (offset, size) = self.offset_and_size();
        Page::of(rows.into_iter().skip(offset).take(size).collect(), total)
    }
}

/// One page of rows plus the number of rows matching before paging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub list: Vec<T>,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn of(list: Vec<T>, total: u64) -> Self {
        Self { list, total }
    }

    /// Rows capped by [`effective_limit`]; `total` is what was returned.
    pub fn limited(rows: Vec<T>, limit: Option<i64>) -> Self {
        let list: Vec<T> = rows.into_iter().take(effective_limit(limit)).collect();
        let total = list.len() as u64;
        Self { list, total }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page { list: self.list.into_iter().map(f).collect(), total: self.total }
    }
}

/// Resolve an option-list limit: absent or non-positive means
/// [`DEFAULT_LIMIT`], [`UNLIMITED`] means [`MAX_LIMIT`], anything else is
/// capped at [`MAX_LIMIT`].
pub fn effective_limit(limit: Option<i64>) -> usize {
    match limit {
        Some(UNLIMITED) => MAX_LIMIT,
        Some(n) if n > 0 => usize::try_from(n).map_or(MAX_LIMIT, |n| n.min(MAX_LIMIT)),
        _ => DEFAULT_LIMIT,
    }
}

/// Case-insensitive substring match used by list searches. A blank needle
/// matches everything.
pub fn contains_keyword(haystack: &str, needle: &str) -> bool {
    let needle = needle.trim();
    needle.is_empty() || haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Inclusive creation-time window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl TimeRange {
    /// Build a window from `yyyy-MM-dd` dates: the start day from midnight,
    /// the end day through `23:59:59`. Unparseable dates are ignored with a
    /// warning.
    pub fn from_dates(start: Option<&str>, end: Option<&str>) -> Self {
        Self {
            from: parse_day(start, "start")
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|t| t.and_utc()),
            to: parse_day(end, "end")
                .and_then(|d| d.and_hms_opt(23, 59, 59))
                .map(|t| t.and_utc()),
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from.is_none_or(|from| at >= from) && self.to.is_none_or(|to| at <= to)
    }
}

fn parse_day(raw: Option<&str>, which: &str) -> Option<NaiveDate> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(day) => Some(day),
        Err(err) => {
            warn!(%raw, %err, which, "ignoring invalid date bound");
            None
        }
    }
}
