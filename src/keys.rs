use chrono::{Datelike, Utc};
use rand::Rng;

use crate::processor::planner::RenditionRole;

/// The length of the random component appended to every storage key.
const SUFFIX_LENGTH: usize = 10;

/// The suffix separating the placeholder rendition's key from the
/// original rendition's key.
const PLACEHOLDER_SUFFIX: &str = "_placeholder";

/// The storage keys for the two renditions of one ingestion.
///
/// Both keys share the same `{year}/{month}/{stem}` prefix, the
/// placeholder key is always the original key with `_placeholder`
/// inserted before the extension.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct KeyPair {
    pub original: String,
    pub placeholder: String,
}

impl KeyPair {
    pub fn key_for(&self, role: RenditionRole) -> &str {
        match role {
            RenditionRole::Original => &self.original,
            RenditionRole::Placeholder => &self.placeholder,
        }
    }
}

/// Derives a fresh key pair for one ingestion.
///
/// The stem is a slug of the client filename (when one was supplied)
/// followed by the current unix timestamp and a random lowercase
/// suffix. Collisions are possible in principle and are not detected,
/// a colliding key overwrites the earlier object.
pub fn derive_key_pair(original_filename: Option<&str>, extension: &str) -> KeyPair {
    let now = Utc::now();
    let suffix = random_suffix();

    let stem = match original_filename.and_then(slug_stem) {
        Some(slug) => format!("{}__{}_{}", slug, now.timestamp(), suffix),
        None => format!("{}_{}", now.timestamp(), suffix),
    };

    // Month is 1-12, deliberately not zero padded.
    let prefix = format!("{}/{}", now.year(), now.month());

    KeyPair {
        original: format!("{}/{}.{}", prefix, stem, extension),
        placeholder: format!("{}/{}{}.{}", prefix, stem, PLACEHOLDER_SUFFIX, extension),
    }
}

/// Reduces a client supplied filename to a URL-safe slug, or `None` if
/// nothing usable remains.
fn slug_stem(filename: &str) -> Option<String> {
    // Trim the extension, then drop any remaining dots.
    let stem = filename
        .rsplit_once('.')
        .map(|(stem, _ext)| stem)
        .unwrap_or(filename)
        .replace('.', "");

    let cleaned: String = stem
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '!' | '?'))
        .collect();

    let slug = cleaned
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase();

    if slug.is_empty() {
        None
    } else {
        Some(slug)
    }
}

fn random_suffix() -> String {
    let mut rng = rand::thread_rng();
    (0..SUFFIX_LENGTH)
        .map(|_| rng.gen_range(b'a'..=b'z') as char)
        .collect()
}
