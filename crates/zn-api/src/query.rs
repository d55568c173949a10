use std::fmt::Display;

/// Ordered query-string parameters.
///
/// Setting a key that is already present replaces its value in place, so
/// pagination can overwrite `_offset` or `_cursor` on every page while the
/// caller's extras (`_filters`, `_search`, `from`, ...) pass through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pairs: Vec<(String, String)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`set`](Self::set).
    pub fn with(mut self, key: impl Into<String>, value: impl Display) -> Self {
        self.set(key, value);
        self
    }

    /// Builder form that skips `None`.
    pub fn with_opt<V: Display>(self, key: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(v) => self.with(key, v),
            None => self,
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Display) {
        let key = key.into();
        let value = value.to_string();
        if let Some(slot) = self.pairs.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.pairs.push((key, value));
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let idx = self.pairs.iter().position(|(k, _)| k == key)?;
        Some(self.pairs.remove(idx).1)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replaces_in_place() {
        let mut q = Query::new().with("_limit", 400).with("_search", "dc");
        q.set("_limit", 1);
        assert_eq!(
            q.pairs(),
            &[
                ("_limit".to_owned(), "1".to_owned()),
                ("_search".to_owned(), "dc".to_owned())
            ]
        );
    }

    #[test]
    fn optional_values_are_skipped() {
        let q = Query::new()
            .with_opt("from", Some(5_i64))
            .with_opt::<i64>("to", None);
        assert_eq!(q.get("from"), Some("5"));
        assert_eq!(q.get("to"), None);
    }

    #[test]
    fn remove_returns_old_value() {
        let mut q = Query::new().with("_cursor", "abc");
        assert_eq!(q.remove("_cursor").as_deref(), Some("abc"));
        assert!(q.is_empty());
    }
}
