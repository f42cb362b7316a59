//! Human-readable module labels for audit records.
//!
//! Audit entries carry the page the user was on (`/system/user`) and a short
//! module key (`user`); operators want the menu title instead. The cache is
//! owned by the caller and expires wholesale after its TTL.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::model::{MenuKind, MenuNode};

/// Label for the personal profile page, which has no menu entry.
pub const PROFILE_LABEL: &str = "Profile";

const PROFILE_MODULE: &str = "profile";
const PROFILE_PATH: &str = "/profile";

#[derive(Debug, Clone)]
pub struct ModuleLabelCache {
    ttl: Duration,
    refreshed_at: Option<DateTime<Utc>>,
    labels: HashMap<String, String>,
}

impl Default for ModuleLabelCache {
    fn default() -> Self {
        Self::new(Duration::minutes(5))
    }
}

/// Defers loading the menu tree until a lookup actually misses the cache.
struct LazyTree<F> {
    load: Option<F>,
    tree: Vec<MenuNode>,
}

impl<F: FnOnce() -> Vec<MenuNode>> LazyTree<F> {
    fn new(load: F) -> Self {
        Self {
            load: Some(load),
            tree: Vec::new(),
        }
    }

    fn get(&mut self) -> &[MenuNode] {
        if let Some(load) = self.load.take() {
            self.tree = load();
        }
        &self.tree
    }
}

impl ModuleLabelCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            refreshed_at: None,
            labels: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Label for a page path, falling back to `module_path` and finally to the
    /// page path without its leading `/`.
    ///
    /// `load_tree` returns the enabled menu forest; it is called at most once,
    /// and only on a cache miss.
    pub fn label_for_page<F>(
        &mut self,
        page_path: &str,
        module_path: Option<&str>,
        now: DateTime<Utc>,
        load_tree: F,
    ) -> String
    where
        F: FnOnce() -> Vec<MenuNode>,
    {
        let page = page_path.trim();
        let module = module_path.unwrap_or_default();
        if page.is_empty() {
            return self.label_for_module(module, now, load_tree);
        }
        if page == PROFILE_PATH || normalize_module_path(module) == PROFILE_MODULE {
            return PROFILE_LABEL.to_string();
        }

        self.refresh_if_expired(now);
        let key = page.to_lowercase();
        if let Some(label) = self.labels.get(&key) {
            return label.clone();
        }

        let mut tree = LazyTree::new(load_tree);
        if let Some(label) = find_by_page_path(tree.get(), page) {
            self.labels.insert(key, label.clone());
            return label;
        }
        if let Some(label) = self.module_label(module, &mut tree) {
            return label;
        }
        match page.strip_prefix('/') {
            Some(rest) if !rest.is_empty() => rest.to_string(),
            _ => page.to_string(),
        }
    }

    /// Label for a short module key such as `operation_log`. Unknown modules
    /// come back unchanged.
    pub fn label_for_module<F>(&mut self, module_path: &str, now: DateTime<Utc>, load_tree: F) -> String
    where
        F: FnOnce() -> Vec<MenuNode>,
    {
        let module = module_path.trim();
        if module.is_empty() {
            return String::new();
        }
        if normalize_module_path(module) == PROFILE_MODULE {
            return PROFILE_LABEL.to_string();
        }
        self.refresh_if_expired(now);
        let mut tree = LazyTree::new(load_tree);
        self.module_label(module, &mut tree).unwrap_or_else(|| {
            debug!(module, "no menu entry matches module");
            module.to_string()
        })
    }

    fn module_label<F>(&mut self, module: &str, tree: &mut LazyTree<F>) -> Option<String>
    where
        F: FnOnce() -> Vec<MenuNode>,
    {
        let key = normalize_module_path(module);
        if key.is_empty() {
            return None;
        }
        if let Some(label) = self.labels.get(&key) {
            return Some(label.clone());
        }
        let label = find_in_tree(tree.get(), |path| {
            let segment = path.rsplit('/').next().unwrap_or(path);
            normalize_module_path(segment) == key
        })?;
        self.labels.insert(key, label.clone());
        Some(label)
    }

    fn refresh_if_expired(&mut self, now: DateTime<Utc>) {
        let expired = self.refreshed_at.is_none_or(|at| now - at > self.ttl);
        if expired {
            if !self.labels.is_empty() {
                debug!(entries = self.labels.len(), "module label cache expired");
            }
            self.labels.clear();
            self.refreshed_at = Some(now);
        }
    }
}

/// Lowercase and map `_` to `-`, the form modules are stored under.
pub fn normalize_module_path(module: &str) -> String {
    module.trim().to_lowercase().replace('_', "-")
}

/// Exact path match first, then the last segment (menus often store relative
/// paths such as `/analytics` for `/dashboard/analytics`).
fn find_by_page_path(tree: &[MenuNode], page: &str) -> Option<String> {
    if let Some(label) = find_in_tree(tree, |path| path == page) {
        return Some(label);
    }
    let (_, last) = page.rsplit_once('/')?;
    let tail = format!("/{last}");
    if tail == page || last.is_empty() {
        return None;
    }
    find_in_tree(tree, |path| path == tail)
}

/// Pre-order search over non-button entries with a path.
fn find_in_tree(tree: &[MenuNode], matches: impl Fn(&str) -> bool) -> Option<String> {
    let mut stack: Vec<&MenuNode> = tree.iter().rev().collect();
    while let Some(node) = stack.pop() {
        if node.kind == MenuKind::Button {
            continue;
        }
        if node.path.as_deref().is_some_and(&matches) {
            return Some(node.display_name());
        }
        stack.extend(node.children.iter().rev());
    }
    None
}
