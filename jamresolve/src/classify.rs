//! Input classification: catalog link, generic media URL, or plain search.

use once_cell::sync::Lazy;
use regex::Regex;

// Tolerates the optional `intl-xx/` path segment and trailing query strings.
static CATALOG_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://open\.spotify\.com/(?:intl-[a-z]+/)?(track|album|playlist)/([A-Za-z0-9]+)")
        .expect("catalog URL pattern is valid")
});

/// Kind of catalog entity a link points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogKind {
    Track,
    Album,
    Playlist,
}

/// A recognized catalog link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRef {
    pub kind: CatalogKind,
    /// Catalog entity id extracted from the URL path.
    pub id: String,
    /// The original URL as supplied by the user.
    pub url: String,
}

/// Classified user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestKind {
    /// A link into the secondary metadata catalog; not itself streamable.
    Catalog(CatalogRef),
    /// Any other http(s) URL, handed to the stream resolver as-is.
    MediaUrl(String),
    /// Free text search.
    Search(String),
}

/// Classify a user-supplied query string.
pub fn classify(input: &str) -> RequestKind {
    let input = input.trim();

    if let Some(caps) = CATALOG_URL.captures(input) {
        let kind = match &caps[1] {
            "track" => CatalogKind::Track,
            "album" => CatalogKind::Album,
            _ => CatalogKind::Playlist,
        };
        return RequestKind::Catalog(CatalogRef {
            kind,
            id: caps[2].to_string(),
            url: input.to_string(),
        });
    }

    if input.starts_with("http://") || input.starts_with("https://") {
        return RequestKind::MediaUrl(input.to_string());
    }

    RequestKind::Search(input.to_string())
}
