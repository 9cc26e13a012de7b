// file: src/models/metadata.rs
// description: frontmatter metadata values with a closed set of variants
// reference: internal data structures

use std::collections::BTreeMap;

/// Ordered by key so that identical metadata always serializes identically.
pub type Metadata = BTreeMap<String, MetaValue>;

pub const TITLE_KEY: &str = "title";
pub const READING_TIME_KEY: &str = "reading_time_min";

#[derive(Debug, Clone, PartialEq)]
pub enum MetaValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Sequence(Vec<MetaValue>),
    Mapping(BTreeMap<String, MetaValue>),
}

impl MetaValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetaValue::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MetaValue::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, MetaValue::Null)
    }
}

impl From<&str> for MetaValue {
    fn from(value: &str) -> Self {
        MetaValue::String(value.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(value: String) -> Self {
        MetaValue::String(value)
    }
}

impl From<i64> for MetaValue {
    fn from(value: i64) -> Self {
        MetaValue::Integer(value)
    }
}

impl From<bool> for MetaValue {
    fn from(value: bool) -> Self {
        MetaValue::Bool(value)
    }
}

impl<T: Into<MetaValue>> From<Option<T>> for MetaValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(MetaValue::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_conversion() {
        assert_eq!(MetaValue::from(None::<String>), MetaValue::Null);
        assert_eq!(
            MetaValue::from(Some("Title")),
            MetaValue::String("Title".to_string())
        );
    }

    #[test]
    fn test_accessors() {
        assert_eq!(MetaValue::from(3i64).as_i64(), Some(3));
        assert_eq!(MetaValue::from("x").as_str(), Some("x"));
        assert!(MetaValue::Null.is_null());
        assert_eq!(MetaValue::Bool(true).as_str(), None);
    }
}
