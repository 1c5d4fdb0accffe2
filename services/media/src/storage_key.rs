//! Storage key derivation
//!
//! Key format: `{prefix}/{owner_id}/{unix_millis}-{random}.{ext}`. The random
//! suffix keeps keys distinct when one owner starts several uploads within
//! the same millisecond.

use chrono::{DateTime, Utc};
use rand::{Rng, distributions::Alphanumeric};
use uuid::Uuid;

const SUFFIX_LEN: usize = 12;
const FALLBACK_EXTENSION: &str = "bin";

/// Build a fresh storage key for `file_name` owned by `owner_id`.
pub fn derive_storage_key(
    prefix: &str,
    owner_id: Uuid,
    file_name: &str,
    mime_type: &str,
    now: DateTime<Utc>,
) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(char::from)
        .collect::<String>()
        .to_ascii_lowercase();

    let extension = extension_of(file_name)
        .or_else(|| extension_for_mime(mime_type).map(str::to_string))
        .unwrap_or_else(|| FALLBACK_EXTENSION.to_string());

    format!(
        "{}/{}/{}-{}.{}",
        prefix.trim_matches('/'),
        owner_id,
        now.timestamp_millis(),
        suffix,
        extension
    )
}

/// Lower-cased extension after the last dot, if it is a plain token.
pub fn extension_of(file_name: &str) -> Option<String> {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    let (stem, ext) = base.rsplit_once('.')?;

    if stem.is_empty() || ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }

    Some(ext.to_ascii_lowercase())
}

fn extension_for_mime(mime_type: &str) -> Option<&'static str> {
    match mime_type {
        "video/mp4" => Some("mp4"),
        "video/quicktime" => Some("mov"),
        "video/x-msvideo" => Some("avi"),
        "video/mpeg" => Some("mpeg"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn key_layout() {
        let owner = Uuid::new_v4();
        let now = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        let key = derive_storage_key("videos", owner, "Holiday.MP4", "video/mp4", now);

        let prefix = format!("videos/{}/1700000000123-", owner);
        assert!(key.starts_with(&prefix), "{}", key);
        assert!(key.ends_with(".mp4"), "{}", key);
        assert_eq!(key.len(), prefix.len() + SUFFIX_LEN + ".mp4".len());
    }

    #[test]
    fn extension_falls_back_to_mime_type() {
        let owner = Uuid::new_v4();
        let now = Utc::now();

        let mov = derive_storage_key("videos", owner, "clip", "video/quicktime", now);
        let avi = derive_storage_key("videos/", owner, "clip.", "video/x-msvideo", now);
        let bin = derive_storage_key("videos", owner, "clip", "video/webm", now);

        assert!(mov.ends_with(".mov"), "{}", mov);
        assert!(avi.ends_with(".avi"), "{}", avi);
        assert!(bin.ends_with(".bin"), "{}", bin);
    }

    #[test]
    fn extension_parsing() {
        assert_eq!(extension_of("a.b.mkv").as_deref(), Some("mkv"));
        assert_eq!(extension_of("dir.d/clip").as_deref(), None);
        assert_eq!(extension_of(".hidden").as_deref(), None);
        assert_eq!(extension_of("weird.mp4?x=1").as_deref(), None);
    }

    #[tokio::test]
    async fn same_millisecond_uploads_get_distinct_keys() {
        let owner = Uuid::new_v4();
        let now = Utc::now();

        let handles: Vec<_> = (0..64)
            .map(|_| {
                tokio::spawn(async move {
                    derive_storage_key("videos", owner, "clip.mp4", "video/mp4", now)
                })
            })
            .collect();

        let mut keys = HashSet::new();
        for handle in handles {
            keys.insert(handle.await.unwrap());
        }

        assert_eq!(keys.len(), 64);
    }
}
