//! Free-text descriptions for recognized labels.
//!
//! The classifier only produces labels. Turning a label into text is a
//! separate collaborator: a configured table maps each label to a lookup key,
//! and a [`DescriptionSource`] resolves keys to text. Lookup failures are
//! logged and swallowed so they never affect a classification.

use std::collections::{BTreeMap, HashMap};

use crate::error::Result;

/// Something that can resolve a lookup key to descriptive text.
pub trait DescriptionSource: Send + Sync {
    /// `Ok(None)` when the source has nothing for `key`.
    fn fetch(&self, key: &str) -> Result<Option<String>>;
}

/// In-memory key → text table.
#[derive(Debug, Clone, Default)]
pub struct StaticDescriptions {
    entries: HashMap<String, String>,
}

impl StaticDescriptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, text: impl Into<String>) {
        self.entries.insert(key.into(), text.into());
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StaticDescriptions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl DescriptionSource for StaticDescriptions {
    fn fetch(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }
}

/// Label → description resolver.
pub struct DescriptionLookup {
    keys: BTreeMap<String, String>,
    source: Box<dyn DescriptionSource>,
}

impl DescriptionLookup {
    pub fn new(keys: BTreeMap<String, String>, source: Box<dyn DescriptionSource>) -> Self {
        Self { keys, source }
    }

    /// Describe `label`, or `None` if no description is available for any reason.
    pub fn describe(&self, label: &str) -> Option<String> {
        let Some(key) = self.keys.get(label) else {
            log::debug!("No description key configured for '{}'", label);
            return None;
        };

        match self.source.fetch(key) {
            Ok(Some(text)) => {
                let text = text.trim();
                (!text.is_empty()).then(|| text.to_string())
            }
            Ok(None) => None,
            Err(e) => {
                log::warn!("Description lookup for '{}' failed: {}", label, e);
                None
            }
        }
    }
}

impl std::fmt::Debug for DescriptionLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DescriptionLookup")
            .field("keys", &self.keys)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    struct Unreachable;

    impl DescriptionSource for Unreachable {
        fn fetch(&self, key: &str) -> Result<Option<String>> {
            Err(Error::DescriptionLookup(format!("{}: connection refused", key)))
        }
    }

    fn keys() -> BTreeMap<String, String> {
        [("Anjali", "samyuta/anjali"), ("Aralam", "asamyuta/arala")]
            .into_iter()
            .map(|(l, k)| (l.to_string(), k.to_string()))
            .collect()
    }

    #[test]
    fn resolves_through_key_table() {
        let source: StaticDescriptions =
            [("samyuta/anjali", "  Palms joined in salutation. \n")].into_iter().collect();
        let lookup = DescriptionLookup::new(keys(), Box::new(source));

        assert_eq!(
            lookup.describe("Anjali").as_deref(),
            Some("Palms joined in salutation.")
        );
        assert_eq!(lookup.describe("Aralam"), None);
        assert_eq!(lookup.describe("Pataka"), None);
    }

    #[test]
    fn blank_text_is_absent() {
        let mut source = StaticDescriptions::new();
        source.insert("asamyuta/arala", "   ");
        let lookup = DescriptionLookup::new(keys(), Box::new(source));

        assert_eq!(lookup.describe("Aralam"), None);
    }

    #[test]
    fn source_failure_is_swallowed() {
        let lookup = DescriptionLookup::new(keys(), Box::new(Unreachable));
        assert_eq!(lookup.describe("Anjali"), None);
    }
}
