//! What can be read off a request before it is logged: the kind of
//! operation, the page it came from and the client software.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    View,
    Add,
    Edit,
    Delete,
    Login,
    Logout,
    Export,
    Import,
    Download,
    Upload,
}

impl OperationType {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationType::View => "view",
            OperationType::Add => "add",
            OperationType::Edit => "edit",
            OperationType::Delete => "delete",
            OperationType::Login => "login",
            OperationType::Logout => "logout",
            OperationType::Export => "export",
            OperationType::Import => "import",
            OperationType::Download => "download",
            OperationType::Upload => "upload",
        }
    }

    /// Classify a request. Well-known URL segments win over the method;
    /// an unknown or absent method counts as a view.
    pub fn infer(request_url: &str, method: Option<&str>) -> Self {
        const BY_URL: &[(&str, OperationType)] = &[
            ("/login", OperationType::Login),
            ("/logout", OperationType::Logout),
            ("/export", OperationType::Export),
            ("/import", OperationType::Import),
            ("/download", OperationType::Download),
            ("/upload", OperationType::Upload),
        ];

        let Some(method) = method else {
            return OperationType::View;
        };
        let url = request_url.to_ascii_lowercase();
        if let Some((_, kind)) = BY_URL.iter().find(|(needle, _)| url.contains(*needle)) {
            return *kind;
        }
        match method.trim().to_ascii_uppercase().as_str() {
            "POST" => OperationType::Add,
            "PUT" | "PATCH" => OperationType::Edit,
            "DELETE" => OperationType::Delete,
            _ => OperationType::View,
        }
    }
}

impl core::fmt::Display for OperationType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trailing action segments stripped when guessing a page from an API URL.
const ACTION_SEGMENTS: &[&str] = &[
    "types", "list", "detail", "add", "edit", "delete", "export", "import", "download", "upload",
];

/// Guess the front-end page an API call was made from.
///
/// Drops the first action segment (`/list`, `/edit`, ...) and everything after
/// it, then a trailing numeric id. Falls back to the API URL when nothing
/// would be left.
pub fn infer_page_path(api_url: &str) -> String {
    let segments: Vec<&str> = api_url.split('/').collect();
    let keep = segments
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, s)| ACTION_SEGMENTS.contains(*s))
        .map_or(segments.len(), |(i, _)| i);
    let mut page = &segments[..keep];
    if let [rest @ .., last] = page {
        if !rest.is_empty() && !last.is_empty() && last.bytes().all(|b| b.is_ascii_digit()) {
            page = rest;
        }
    }
    let page = page.join("/");
    if page.is_empty() { api_url.to_string() } else { page }
}

/// Browser and operating system named by a `User-Agent` header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub browser: String,
    pub os: String,
}

impl ClientInfo {
    pub const UNKNOWN: &'static str = "Unknown";

    /// `None` for a blank header.
    pub fn from_user_agent(user_agent: &str) -> Option<Self> {
        let ua = user_agent.trim().to_ascii_lowercase();
        if ua.is_empty() {
            return None;
        }
        Some(Self {
            browser: browser_of(&ua).to_string(),
            os: os_of(&ua).to_string(),
        })
    }
}

fn browser_of(ua: &str) -> &'static str {
    // order matters: Edge and Opera also announce Chrome, Chrome announces Safari
    if ua.contains("edg") {
        "Edge"
    } else if ua.contains("opr") || ua.contains("opera") {
        "Opera"
    } else if ua.contains("chrome") {
        "Chrome"
    } else if ua.contains("firefox") {
        "Firefox"
    } else if ua.contains("safari") {
        "Safari"
    } else if ua.contains("msie") || ua.contains("trident") {
        "IE"
    } else {
        ClientInfo::UNKNOWN
    }
}

fn os_of(ua: &str) -> &'static str {
    // mobile first: iOS announces "mac os x", Android announces "linux"
    if ua.contains("windows") {
        if ua.contains("windows nt 10.0") {
            "Windows 10"
        } else if ua.contains("windows nt 6.3") {
            "Windows 8.1"
        } else if ua.contains("windows nt 6.2") {
            "Windows 8"
        } else if ua.contains("windows nt 6.1") {
            "Windows 7"
        } else {
            "Windows"
        }
    } else if ua.contains("iphone") || ua.contains("ipad") {
        "iOS"
    } else if ua.contains("android") {
        "Android"
    } else if ua.contains("mac") {
        "Mac OS"
    } else if ua.contains("linux") {
        "Linux"
    } else {
        ClientInfo::UNKNOWN
    }
}
