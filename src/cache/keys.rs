use std::fmt;

use crate::models::PageRequest;

/// Ordered path of segments identifying one cached query result, e.g.
/// `albums/42/photos/desc/1/50`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }

    fn with_page(mut self, page: &PageRequest) -> Self {
        self.0.push(page.order.to_string());
        self.0.push(page.page.to_string());
        self.0.push(page.limit.to_string());
        self
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyPattern {
    Exact(QueryKey),
    /// The key itself and every key below it.
    Prefix(QueryKey),
}

impl KeyPattern {
    pub fn matches(&self, key: &QueryKey) -> bool {
        match self {
            KeyPattern::Exact(k) => k == key,
            KeyPattern::Prefix(prefix) => key.starts_with(prefix),
        }
    }
}

impl fmt::Display for KeyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPattern::Exact(k) => write!(f, "{}", k),
            KeyPattern::Prefix(k) => write!(f, "{}/*", k),
        }
    }
}

pub fn albums() -> QueryKey {
    QueryKey::new(["albums"])
}

pub fn album(id: &str) -> QueryKey {
    QueryKey::new(["albums", id])
}

pub fn shared_album(share_token: &str) -> QueryKey {
    QueryKey::new(["albums", "shared", share_token])
}

/// Parent of every photo page and photo entry of an album.
pub fn album_photos(album_id: &str) -> QueryKey {
    QueryKey::new(["albums", album_id, "photos"])
}

pub fn album_photos_page(album_id: &str, page: &PageRequest) -> QueryKey {
    album_photos(album_id).with_page(page)
}

pub fn photo(album_id: &str, photo_id: &str) -> QueryKey {
    QueryKey::new(["albums", album_id, "photos", "item", photo_id])
}

pub fn photo_search(query: &str, page: &PageRequest) -> QueryKey {
    QueryKey::new(["photos", "search", query]).with_page(page)
}

pub fn user_me() -> QueryKey {
    QueryKey::new(["user", "me"])
}
