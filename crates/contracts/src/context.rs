//! RequestContext - per-invocation name/value bag handed to the processor

use std::collections::btree_map::{self, BTreeMap};
use std::fmt;

use serde::Serialize;

use crate::ApiKey;

/// Entry carrying the credential
pub const API_KEY_HEADER: &str = "x-api-key";

/// Entry carrying the incoming file name
pub const CONTAINER_NAME_KEY: &str = "ContainerName";

/// Mapping from unique string keys to string values.
///
/// Built fresh for every incoming file and moved into the processor; never retained
/// by the dispatcher afterwards.
#[derive(Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct RequestContext {
    entries: BTreeMap<String, String>,
}

impl RequestContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Context with the two mandatory entries for `file_name`
    pub fn for_file(api_key: &ApiKey, file_name: &str) -> Self {
        let mut ctx = Self::new();
        ctx.insert(API_KEY_HEADER, api_key.expose());
        ctx.insert(CONTAINER_NAME_KEY, file_name);
        ctx
    }

    /// Insert an entry, returning the value it replaced
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), value.into())
    }

    /// Add entries whose keys are not present yet; existing keys win
    pub fn extend_missing<'a, I>(&mut self, extra: I)
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        for (key, value) in extra {
            self.entries
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Credential entry
    pub fn api_key(&self) -> Option<&str> {
        self.get(API_KEY_HEADER)
    }

    /// File name entry
    pub fn container_name(&self) -> Option<&str> {
        self.get(CONTAINER_NAME_KEY)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, String> {
        self.entries.iter()
    }

    /// Copy of the entries with the credential removed (safe to persist or log)
    pub fn without_secret(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .filter(|(k, _)| k.as_str() != API_KEY_HEADER)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(k, v)| {
                let shown = if k == API_KEY_HEADER { "***" } else { v.as_str() };
                (k, shown)
            }))
            .finish()
    }
}

impl<'a> IntoIterator for &'a RequestContext {
    type Item = (&'a String, &'a String);
    type IntoIter = btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_file_has_mandatory_entries() {
        let ctx = RequestContext::for_file(&ApiKey::new("k-1"), "invoice_42.pdf");
        assert_eq!(ctx.len(), 2);
        assert_eq!(ctx.api_key(), Some("k-1"));
        assert_eq!(ctx.container_name(), Some("invoice_42.pdf"));
    }

    #[test]
    fn test_extend_missing_keeps_existing_keys() {
        let mut ctx = RequestContext::for_file(&ApiKey::new("k-1"), "a.csv");
        let extra = BTreeMap::from([
            (CONTAINER_NAME_KEY.to_string(), "other".to_string()),
            ("Source".to_string(), "blob-trigger".to_string()),
        ]);
        ctx.extend_missing(&extra);

        assert_eq!(ctx.container_name(), Some("a.csv"));
        assert_eq!(ctx.get("Source"), Some("blob-trigger"));
        assert_eq!(ctx.len(), 3);
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let ctx = RequestContext::for_file(&ApiKey::new("secret-value"), "a.csv");
        let debug = format!("{ctx:?}");
        assert!(!debug.contains("secret-value"));
        assert!(debug.contains("a.csv"));
    }

    #[test]
    fn test_without_secret() {
        let ctx = RequestContext::for_file(&ApiKey::new("secret-value"), "a.csv");
        let public = ctx.without_secret();
        assert!(!public.contains_key(API_KEY_HEADER));
        assert_eq!(public.get(CONTAINER_NAME_KEY).map(String::as_str), Some("a.csv"));
    }

    #[test]
    fn test_serializes_as_flat_map() {
        let ctx = RequestContext::for_file(&ApiKey::new("k"), "a.csv");
        let json = serde_json::to_value(&ctx).unwrap();
        assert_eq!(json["ContainerName"], "a.csv");
        assert_eq!(json["x-api-key"], "k");
    }
}
