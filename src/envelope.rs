//! Hypermedia response envelope
//!
//! Every JSON response of the service, success or failure, is wrapped in the
//! same envelope: a `_links` section with at least `request` and `collection`,
//! a `data` list and an `error` string (empty string means success). The
//! envelope is a pure function of the request path and the payload so clients
//! can rely on the shape regardless of outcome.

use serde::Serialize;
use std::collections::BTreeMap;

/// Link target inside the `_links` section. `name` is only populated for
/// per-file links on listing endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Link {
    pub href: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Link {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            name: None,
        }
    }

    pub fn named(href: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            name: Some(name.into()),
        }
    }
}

/// The uniform response envelope.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    #[serde(rename = "_links")]
    pub links: BTreeMap<String, Link>,
    pub data: Vec<String>,
    pub error: String,
}

impl Envelope {
    /// Build the base envelope for a request path. `request` points back at
    /// the path itself, `collection` at its relative parent.
    pub fn new(request_path: &str, data: Vec<String>, error: impl Into<String>) -> Self {
        let mut links = BTreeMap::new();
        links.insert("request".to_string(), Link::new(request_path));
        links.insert(
            "collection".to_string(),
            Link::new(collection_href(request_path)),
        );
        Self {
            links,
            data,
            error: error.into(),
        }
    }

    /// Add one hypermedia control, keyed by resource identifier.
    pub fn add_link(&mut self, key: impl Into<String>, link: Link) {
        self.links.insert(key.into(), link);
    }
}

/// Relative parent of a path: the path with its last two `/`-delimited
/// segments removed. A single trailing slash is always kept, even when
/// nothing else is left, so getting the collection of the root is safe.
pub fn collection_href(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').collect();
    let keep = segments.len().saturating_sub(2);
    format!("{}/", segments[..keep].join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_href_for_file_path() {
        assert_eq!(collection_href("/api/files/ns/id/"), "/api/files/ns/");
    }

    #[test]
    fn test_collection_href_for_namespace_path() {
        assert_eq!(collection_href("/api/files/ns/"), "/api/files/");
    }

    #[test]
    fn test_collection_href_for_files_root() {
        assert_eq!(collection_href("/api/files/"), "/api/");
    }

    #[test]
    fn test_collection_href_for_root() {
        assert_eq!(collection_href("/"), "/");
    }

    #[test]
    fn test_envelope_shape() {
        let envelope = Envelope::new("/api/files/", vec!["ns".to_string()], "");
        let json = serde_json::to_value(&envelope).unwrap();

        assert_eq!(json["_links"]["request"]["href"], "/api/files/");
        assert_eq!(json["_links"]["collection"]["href"], "/api/");
        assert_eq!(json["data"][0], "ns");
        assert_eq!(json["error"], "");
    }

    #[test]
    fn test_envelope_shape_identical_on_failure() {
        let envelope = Envelope::new("/api/files/nope/", vec![], "Invalid database name 'nope'.");
        let json = serde_json::to_value(&envelope).unwrap();

        assert_eq!(json["_links"]["request"]["href"], "/api/files/nope/");
        assert_eq!(json["_links"]["collection"]["href"], "/api/files/");
        assert_eq!(json["data"].as_array().unwrap().len(), 0);
        assert_eq!(json["error"], "Invalid database name 'nope'.");
    }

    #[test]
    fn test_named_link_serializes_name() {
        let mut envelope = Envelope::new("/api/files/ns/", vec![], "");
        envelope.add_link("someid", Link::named("/api/files/ns/someid", "notes.txt"));

        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["_links"]["someid"]["href"], "/api/files/ns/someid");
        assert_eq!(json["_links"]["someid"]["name"], "notes.txt");
        // Plain links must not carry a name key at all.
        assert!(json["_links"]["request"].get("name").is_none());
    }
}
