use chrono::{DateTime, NaiveDateTime};
use std::convert::Infallible;
use std::str::FromStr;

/// Seconds since the Unix epoch.
pub type Timestamp = i64;

#[derive(Debug, Clone)]
pub struct ThreadComment {
    pub id: String,
    pub author: String,
    pub text: String,
    // Raw creation time as supplied by the source, parsed lazily
    pub date: String,
    pub children: Vec<ThreadComment>,
}

impl ThreadComment {
    pub fn new(id: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            author: String::new(),
            text: String::new(),
            date: date.into(),
            children: Vec::new(),
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_children(mut self, children: Vec<ThreadComment>) -> Self {
        self.children = children;
        self
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Creation time in epoch seconds. A missing or unparseable date counts as 0
    /// so one bad comment cannot take the rest of the page down with it.
    pub fn timestamp(&self) -> Timestamp {
        match parse_comment_date(&self.date) {
            Some(ts) => ts,
            None => {
                tracing::warn!(
                    comment_id = %self.id,
                    date = %self.date,
                    "unparseable comment date, using 0"
                );
                0
            }
        }
    }

    // Total number of comments in this subtree, including self
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(|c| c.count()).sum::<usize>()
    }
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` (both read as UTC)
/// or a bare epoch integer.
pub fn parse_comment_date(raw: &str) -> Option<Timestamp> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(secs) = raw.parse::<i64>() {
        return Some(secs);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp());
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc().timestamp());
        }
    }

    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListStyle {
    Div,
    Ol,
    #[default]
    Ul,
}

impl FromStr for ListStyle {
    type Err = Infallible;

    // Anything that isn't "div" or "ol" renders as list items inside a <ul>
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "div" => Self::Div,
            "ol" => Self::Ol,
            _ => Self::Ul,
        })
    }
}

impl ListStyle {
    /// Opening tag token every comment fragment starts with.
    pub fn tag_token(&self) -> &'static str {
        match self {
            Self::Div => "<div",
            Self::Ol | Self::Ul => "<li",
        }
    }
}

#[derive(Debug, Clone)]
pub struct WalkArgs {
    pub style: ListStyle,
    pub max_depth: i32,
    pub page: i32,
    pub per_page: i32,
    pub reverse_top_level: bool,
    pub reverse_children: bool,
}

impl Default for WalkArgs {
    fn default() -> Self {
        Self {
            style: ListStyle::Ul,
            max_depth: 5,
            page: 1,
            per_page: 20, // Display 20 top-level comments per page
            reverse_top_level: false,
            reverse_children: false,
        }
    }
}
