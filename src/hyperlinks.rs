use axum::http::Uri;

pub const QUESTIONS: &str = "questions";
pub const CHOICES: &str = "choices";

/// Hyperlinks
///
/// Builds absolute resource URLs from the configured public base and maps
/// them back to ids. Only the path is considered when resolving, so links
/// survive a change of host.
#[derive(Debug, Clone)]
pub struct Hyperlinks {
    base: String,
    // Path component of `base` without the trailing slash, "" at the root.
    base_path: String,
}

impl Hyperlinks {
    pub fn new(public_url: &str) -> Self {
        let base = public_url.trim_end_matches('/').to_string();
        let base_path = base
            .parse::<Uri>()
            .map(|uri| uri.path().trim_end_matches('/').to_string())
            .unwrap_or_default();
        Self { base, base_path }
    }

    /// Collection URL of a registered resource: `{base}/{prefix}/`.
    pub fn collection(&self, prefix: &str) -> String {
        format!("{}/{}/", self.base, prefix)
    }

    pub fn detail(&self, prefix: &str, id: i64) -> String {
        format!("{}/{}/{}/", self.base, prefix, id)
    }

    pub fn question(&self, id: i64) -> String {
        self.detail(QUESTIONS, id)
    }

    pub fn choice(&self, id: i64) -> String {
        self.detail(CHOICES, id)
    }

    pub fn resolve_question(&self, link: &str) -> Option<i64> {
        resolve_under(link, &self.base_path, QUESTIONS)
    }
}

/// Extracts the id from a `/{prefix}/{id}/` link (absolute or path-only).
pub fn resolve(link: &str, prefix: &str) -> Option<i64> {
    resolve_under(link, "", prefix)
}

/// Like [`resolve`] for an API mounted below `base_path` (e.g. `/api`). The
/// whole remaining path must be exactly `/{prefix}/{id}`, with an optional
/// trailing slash.
pub fn resolve_under(link: &str, base_path: &str, prefix: &str) -> Option<i64> {
    let uri: Uri = link.trim().parse().ok()?;
    let rest = uri.path().strip_prefix(base_path)?;
    let rest = rest.strip_prefix('/')?;
    let rest = rest.strip_suffix('/').unwrap_or(rest);

    let mut segments = rest.split('/');
    match (segments.next(), segments.next(), segments.next()) {
        (Some(head), Some(id), None) if head == prefix => {
            id.parse().ok().filter(|id: &i64| *id > 0)
        }
        _ => None,
    }
}
