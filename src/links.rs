// Link sanitizing for candidate reference URLs
//
// Generators often invent direct item-page links that 404. Anything that
// is not clearly safe is replaced by a marketplace search for the name.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::candidate::CandidateRecord;

pub const DEFAULT_SEARCH_BASE: &str = "https://www.amazon.com/s?k=";
pub const DEFAULT_TRUSTED_PREFIX: &str = "http";

pub fn default_reserved_segments() -> Vec<String> {
    vec!["/dp/".to_string(), "/gp/".to_string()]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkPolicy {
    /// Scheme prefix a trusted URL must start with
    pub required_prefix: String,
    /// Path markers of direct item and vendor pages
    pub reserved_segments: Vec<String>,
    /// Search endpoint; the encoded name is appended
    pub search_base: String,
}

impl Default for LinkPolicy {
    fn default() -> Self {
        Self {
            required_prefix: DEFAULT_TRUSTED_PREFIX.to_string(),
            reserved_segments: default_reserved_segments(),
            search_base: DEFAULT_SEARCH_BASE.to_string(),
        }
    }
}

impl LinkPolicy {
    pub fn is_trusted(&self, url: &str) -> bool {
        !url.is_empty()
            && url.starts_with(&self.required_prefix)
            && !self
                .reserved_segments
                .iter()
                .any(|segment| url.contains(segment.as_str()))
    }

    pub fn search_url(&self, name: &str) -> String {
        format!("{}{}", self.search_base, urlencoding::encode(name.trim()))
    }

    /// Return the candidate with a URL that is either trusted or a search link
    pub fn sanitize(&self, candidate: &CandidateRecord) -> CandidateRecord {
        let mut sanitized = candidate.clone();
        let url = candidate.url.as_deref().unwrap_or("");

        if !self.is_trusted(url) {
            let replacement = self.search_url(&candidate.name);
            debug!(
                "Replacing untrusted link for '{}': '{}' -> '{}'",
                candidate.name, url, replacement
            );
            sanitized.url = Some(replacement);
        }

        sanitized
    }
}
