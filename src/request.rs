//! Inbound request schema for `GET /image`.

use crate::{Error, Issue, Result};
use url::Url;

/// Longest caption accepted, in Unicode scalar values.
pub const MAX_CAPTION_CHARS: usize = 100;

/// A validated render request. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    pub icon_url: Url,
    pub caption: String,
}

impl RenderRequest {
    /// Build a request from already separated values.
    pub fn new(icon: &str, caption: &str) -> Result<Self> {
        let mut issues = Vec::new();
        let icon_url = validate_icon(Some(icon), &mut issues);
        let caption = validate_caption(Some(caption), &mut issues);
        finish(icon_url, caption, issues)
    }

    /// Parse and validate a raw query string (`icon=...&text=...`).
    ///
    /// Performs no I/O; every violation is reported at once.
    pub fn from_query(query: &str) -> Result<Self> {
        let mut icon = None;
        let mut text = None;
        for (key, value) in url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
            match key.as_ref() {
                "icon" if icon.is_none() => icon = Some(value.into_owned()),
                "text" if text.is_none() => text = Some(value.into_owned()),
                _ => {}
            }
        }

        let mut issues = Vec::new();
        let icon_url = validate_icon(icon.as_deref(), &mut issues);
        let caption = validate_caption(text.as_deref(), &mut issues);
        finish(icon_url, caption, issues)
    }
}

fn finish(icon_url: Option<Url>, caption: Option<String>, issues: Vec<Issue>) -> Result<RenderRequest> {
    match (icon_url, caption) {
        (Some(icon_url), Some(caption)) if issues.is_empty() => Ok(RenderRequest { icon_url, caption }),
        _ => Err(Error::Validation(issues)),
    }
}

fn validate_icon(raw: Option<&str>, issues: &mut Vec<Issue>) -> Option<Url> {
    let Some(raw) = raw else {
        issues.push(Issue::new("icon", "Required"));
        return None;
    };
    match Url::parse(raw) {
        Ok(url) if !url.cannot_be_a_base() => Some(url),
        Ok(_) => {
            issues.push(Issue::new("icon", "Invalid url"));
            None
        }
        Err(e) => {
            issues.push(Issue::new("icon", format!("Invalid url: {}", e)));
            None
        }
    }
}

fn validate_caption(raw: Option<&str>, issues: &mut Vec<Issue>) -> Option<String> {
    let Some(raw) = raw else {
        issues.push(Issue::new("text", "Required"));
        return None;
    };
    let len = raw.chars().count();
    if len == 0 {
        issues.push(Issue::new("text", "String must contain at least 1 character(s)"));
        None
    } else if len > MAX_CAPTION_CHARS {
        issues.push(Issue::new(
            "text",
            format!("String must contain at most {} character(s)", MAX_CAPTION_CHARS),
        ));
        None
    } else {
        Some(raw.to_string())
    }
}
