// Settings module
// Host-style settings objects: typed fields, nested arrays and merge-on-apply

use std::collections::BTreeMap;

/// A single settings field value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Int(i64),
    Array(Vec<Settings>),
}

/// Named fields of a source or script, as the host stores them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    fields: BTreeMap<String, Value>,
}

impl Settings {
    /// Create an empty settings object
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a string field, `""` when missing or not a string
    pub fn get_string(&self, key: &str) -> &str {
        match self.fields.get(key) {
            Some(Value::String(s)) => s,
            _ => "",
        }
    }

    /// Read an integer field, `0` when missing or not an integer
    pub fn get_int(&self, key: &str) -> i64 {
        match self.fields.get(key) {
            Some(Value::Int(v)) => *v,
            _ => 0,
        }
    }

    /// Read an array field, empty when missing or not an array
    pub fn get_array(&self, key: &str) -> &[Settings] {
        match self.fields.get(key) {
            Some(Value::Array(items)) => items,
            _ => &[],
        }
    }

    pub fn has(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn set_string(&mut self, key: &str, value: impl Into<String>) {
        self.fields.insert(key.to_string(), Value::String(value.into()));
    }

    pub fn set_int(&mut self, key: &str, value: i64) {
        self.fields.insert(key.to_string(), Value::Int(value));
    }

    pub fn set_array(&mut self, key: &str, items: Vec<Settings>) {
        self.fields.insert(key.to_string(), Value::Array(items));
    }

    /// Set a string only if the key has no value yet
    pub fn set_default_string(&mut self, key: &str, value: &str) {
        if !self.has(key) {
            self.set_string(key, value);
        }
    }

    /// Set an integer only if the key has no value yet
    pub fn set_default_int(&mut self, key: &str, value: i64) {
        if !self.has(key) {
            self.set_int(key, value);
        }
    }

    /// Overwrite the fields present in `other`, keeping every other field
    pub fn apply(&mut self, other: &Settings) {
        for (key, value) in &other.fields {
            self.fields.insert(key.clone(), value.clone());
        }
    }

    /// Build a host file list array (`[{ "value": path }, ...]`)
    pub fn file_list<I, S>(paths: I) -> Vec<Settings>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        paths
            .into_iter()
            .map(|path| {
                let mut item = Settings::new();
                item.set_string("value", path);
                item
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_use_host_defaults() {
        let settings = Settings::new();
        assert_eq!(settings.get_string("text"), "");
        assert_eq!(settings.get_int("cur_index"), 0);
        assert!(settings.get_array("files").is_empty());
    }

    #[test]
    fn test_wrong_type_reads_as_default() {
        let mut settings = Settings::new();
        settings.set_int("text", 5);
        assert_eq!(settings.get_string("text"), "");
        assert_eq!(settings.get_int("text"), 5);
    }

    #[test]
    fn test_apply_merges() {
        let mut current = Settings::new();
        current.set_string("text", "old");
        current.set_string("font", "Sans");
        current.set_int("color", 0xffffff);

        let mut change = Settings::new();
        change.set_string("text", "new");
        current.apply(&change);

        assert_eq!(current.get_string("text"), "new");
        assert_eq!(current.get_string("font"), "Sans");
        assert_eq!(current.get_int("color"), 0xffffff);
    }

    #[test]
    fn test_defaults_do_not_overwrite() {
        let mut settings = Settings::new();
        settings.set_string("trigger", "poll");
        settings.set_default_string("trigger", "signals");
        settings.set_default_int("poll_interval_ms", 200);
        assert_eq!(settings.get_string("trigger"), "poll");
        assert_eq!(settings.get_int("poll_interval_ms"), 200);
    }

    #[test]
    fn test_file_list_layout() {
        let files = Settings::file_list(["/a/one.png", "/a/two.jpg"]);
        assert_eq!(files.len(), 2);
        assert_eq!(files[1].get_string("value"), "/a/two.jpg");
    }
}
