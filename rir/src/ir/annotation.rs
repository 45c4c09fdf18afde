use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Display;
use tracing::warn;

/// Named tags that passes attach to nodes, such as `justUnrolled`.
///
/// A tag may carry a value, but most tags are plain markers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Annotations {
    map: BTreeMap<String, Option<String>>,
}

impl Annotations {
    /// Add an annotation.
    ///
    /// Adding a name twice is a mistake in the calling pass, but not a fatal
    /// one; the value is overwritten.
    pub fn add(&mut self, name: &str, value: Option<&str>) {
        if self.map.contains_key(name) {
            warn!("Annotation {name} was already present");
        }
        self.map
            .insert(name.to_string(), value.map(|v| v.to_string()));
    }
    pub fn has(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }
    pub fn get(&self, name: &str) -> Option<&str> {
        match self.map.get(name) {
            Some(Some(value)) => Some(value.as_str()),
            _ => None,
        }
    }
    /// Remove an annotation that must be present.
    pub fn remove(&mut self, name: &str) {
        let removed = self.map.remove(name);
        assert!(
            removed.is_some(),
            "Tried to remove annotation {name} which is not present"
        );
    }
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
    pub fn len(&self) -> usize {
        self.map.len()
    }
    pub fn names(&self) -> Vec<&str> {
        self.map.keys().map(|k| k.as_str()).collect()
    }
}

impl Display for Annotations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self
            .map
            .iter()
            .map(|(name, value)| match value {
                Some(value) => format!("{name}={value}"),
                None => name.clone(),
            })
            .collect::<Vec<String>>();
        write!(f, "{{{}}}", entries.join(", "))
    }
}
