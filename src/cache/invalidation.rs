use std::fmt;

use crate::cache::keys::{self, KeyPattern};

/// A successful write and the cached queries it makes stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    CreateAlbum,
    UpdateAlbum { album_id: String },
    ShareAlbum { album_id: String },
    DeleteAlbum { album_id: String },
    CreatePhoto { album_id: String },
    UpdatePhoto { album_id: String },
    DeletePhoto { album_id: String },
    DeletePhotos { album_id: String },
    UpdateProfile,
}

impl Mutation {
    pub fn invalidation_set(&self) -> Vec<KeyPattern> {
        match self {
            Mutation::CreateAlbum | Mutation::DeleteAlbum { .. } => {
                vec![KeyPattern::Exact(keys::albums())]
            }
            Mutation::UpdateAlbum { album_id } | Mutation::ShareAlbum { album_id } => vec![
                KeyPattern::Exact(keys::albums()),
                KeyPattern::Exact(keys::album(album_id)),
            ],
            // Adding or removing a photo shifts every page boundary
            Mutation::CreatePhoto { album_id }
            | Mutation::UpdatePhoto { album_id }
            | Mutation::DeletePhoto { album_id }
            | Mutation::DeletePhotos { album_id } => vec![
                KeyPattern::Prefix(keys::album_photos(album_id)),
                KeyPattern::Exact(keys::album(album_id)),
                KeyPattern::Exact(keys::albums()),
            ],
            Mutation::UpdateProfile => vec![KeyPattern::Exact(keys::user_me())],
        }
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mutation::CreateAlbum => write!(f, "create album"),
            Mutation::UpdateAlbum { album_id } => write!(f, "update album {}", album_id),
            Mutation::ShareAlbum { album_id } => write!(f, "share album {}", album_id),
            Mutation::DeleteAlbum { album_id } => write!(f, "delete album {}", album_id),
            Mutation::CreatePhoto { album_id } => write!(f, "create photo in {}", album_id),
            Mutation::UpdatePhoto { album_id } => write!(f, "update photo in {}", album_id),
            Mutation::DeletePhoto { album_id } => write!(f, "delete photo in {}", album_id),
            Mutation::DeletePhotos { album_id } => write!(f, "delete photos in {}", album_id),
            Mutation::UpdateProfile => write!(f, "update profile"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::keys::QueryKey;
    use crate::cache::QueryCache;
    use crate::models::{PageRequest, SortOrder};
    use serde_json::json;
    use std::collections::BTreeSet;

    /// A cache holding one entry for every kind of key, across two albums.
    fn populated_cache() -> QueryCache {
        let cache = QueryCache::new();
        let first = PageRequest::default();
        let second = PageRequest::new(SortOrder::Asc, 2, 10);
        for key in [
            keys::albums(),
            keys::album("a1"),
            keys::album("a2"),
            keys::album_photos_page("a1", &first),
            keys::album_photos_page("a1", &second),
            keys::album_photos_page("a2", &first),
            keys::photo("a1", "p1"),
            keys::photo("a2", "p9"),
            keys::shared_album("tok"),
            keys::photo_search("beach", &first),
            keys::user_me(),
        ] {
            cache.store(key, json!({}));
        }
        cache
    }

    fn stale_after(mutation: Mutation) -> BTreeSet<String> {
        let cache = populated_cache();
        cache.invalidate_all(&mutation.invalidation_set());
        cache.stale_keys().iter().map(QueryKey::to_string).collect()
    }

    fn set(keys: &[&str]) -> BTreeSet<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn test_create_album_invalidates_collection_only() {
        assert_eq!(stale_after(Mutation::CreateAlbum), set(&["albums"]));
    }

    #[test]
    fn test_update_and_share_album_invalidate_collection_and_entry() {
        let expected = set(&["albums", "albums/a1"]);
        assert_eq!(
            stale_after(Mutation::UpdateAlbum { album_id: "a1".into() }),
            expected
        );
        assert_eq!(
            stale_after(Mutation::ShareAlbum { album_id: "a1".into() }),
            expected
        );
    }

    #[test]
    fn test_delete_album_invalidates_collection_only() {
        assert_eq!(
            stale_after(Mutation::DeleteAlbum { album_id: "a1".into() }),
            set(&["albums"])
        );
    }

    #[test]
    fn test_photo_mutations_invalidate_pages_entry_and_collection() {
        let expected = set(&[
            "albums",
            "albums/a1",
            "albums/a1/photos/desc/1/50",
            "albums/a1/photos/asc/2/10",
            "albums/a1/photos/item/p1",
        ]);
        for mutation in [
            Mutation::CreatePhoto { album_id: "a1".into() },
            Mutation::UpdatePhoto { album_id: "a1".into() },
            Mutation::DeletePhoto { album_id: "a1".into() },
            Mutation::DeletePhotos { album_id: "a1".into() },
        ] {
            assert_eq!(stale_after(mutation.clone()), expected, "{}", mutation);
        }
    }

    #[test]
    fn test_update_profile_invalidates_user() {
        assert_eq!(stale_after(Mutation::UpdateProfile), set(&["user/me"]));
    }
}
