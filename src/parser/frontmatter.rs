// file: src/parser/frontmatter.rs
// description: YAML frontmatter loading and escape-safe serialization
// reference: https://docs.rs/yaml-rust

use crate::error::{ConversionError, Result};
use crate::models::{MetaValue, Metadata};
use std::collections::BTreeMap;
use yaml_rust::yaml::Hash;
use yaml_rust::{Yaml, YamlEmitter, YamlLoader};

pub const FRONTMATTER_DELIMITER: &str = "---";

pub struct FrontmatterParser;

impl FrontmatterParser {
    pub fn new() -> Self {
        Self
    }

    /// Loads the body of a `---` block (without delimiters) into metadata.
    pub fn parse(&self, yaml_content: &str) -> Result<Metadata> {
        let docs = YamlLoader::load_from_str(yaml_content)
            .map_err(|e| ConversionError::FrontmatterParse(format!("YAML parse error: {}", e)))?;

        let Some(doc) = docs.into_iter().next() else {
            return Ok(Metadata::new());
        };

        match doc {
            Yaml::Hash(hash) => mapping_from_yaml(hash),
            Yaml::Null => Ok(Metadata::new()),
            other => Err(ConversionError::FrontmatterParse(format!(
                "frontmatter must be a mapping, found {:?}",
                other
            ))),
        }
    }

    /// Emits `key: value` lines without the surrounding delimiters.
    pub fn serialize(&self, metadata: &Metadata) -> Result<String> {
        let mut hash = Hash::new();
        for (key, value) in metadata {
            hash.insert(Yaml::String(key.clone()), value_to_yaml(key, value)?);
        }

        let mut output = String::new();
        YamlEmitter::new(&mut output)
            .dump(&Yaml::Hash(hash))
            .map_err(|e| ConversionError::Serialization(format!("YAML emit error: {:?}", e)))?;

        let body = output.strip_prefix(FRONTMATTER_DELIMITER).unwrap_or(&output);
        Ok(body.trim().to_string())
    }
}

impl Default for FrontmatterParser {
    fn default() -> Self {
        Self::new()
    }
}

fn mapping_from_yaml(hash: Hash) -> Result<BTreeMap<String, MetaValue>> {
    let mut mapping = BTreeMap::new();
    for (key, value) in hash {
        let key = match key {
            Yaml::String(key) => key,
            other => {
                return Err(ConversionError::FrontmatterParse(format!(
                    "frontmatter keys must be strings, found {:?}",
                    other
                )));
            }
        };
        let value = value_from_yaml(&key, value)?;
        mapping.insert(key, value);
    }
    Ok(mapping)
}

fn value_from_yaml(key: &str, value: Yaml) -> Result<MetaValue> {
    match value {
        Yaml::Null => Ok(MetaValue::Null),
        Yaml::Boolean(value) => Ok(MetaValue::Bool(value)),
        Yaml::Integer(value) => Ok(MetaValue::Integer(value)),
        Yaml::String(value) => Ok(MetaValue::String(value)),
        real @ Yaml::Real(_) => real.as_f64().map(MetaValue::Float).ok_or_else(|| {
            ConversionError::FrontmatterParse(format!("invalid number for key '{}'", key))
        }),
        Yaml::Array(items) => items
            .into_iter()
            .map(|item| value_from_yaml(key, item))
            .collect::<Result<Vec<_>>>()
            .map(MetaValue::Sequence),
        Yaml::Hash(hash) => mapping_from_yaml(hash).map(MetaValue::Mapping),
        Yaml::Alias(_) | Yaml::BadValue => Err(ConversionError::FrontmatterParse(format!(
            "unsupported value for key '{}'",
            key
        ))),
    }
}

fn value_to_yaml(key: &str, value: &MetaValue) -> Result<Yaml> {
    let yaml = match value {
        MetaValue::Null => Yaml::Null,
        MetaValue::Bool(value) => Yaml::Boolean(*value),
        MetaValue::Integer(value) => Yaml::Integer(*value),
        MetaValue::Float(value) => {
            if !value.is_finite() {
                return Err(ConversionError::Serialization(format!(
                    "value for key '{}' is not a finite number",
                    key
                )));
            }
            Yaml::Real(format!("{:?}", value))
        }
        MetaValue::String(value) => Yaml::String(value.clone()),
        MetaValue::Sequence(items) => Yaml::Array(
            items
                .iter()
                .map(|item| value_to_yaml(key, item))
                .collect::<Result<Vec<_>>>()?,
        ),
        MetaValue::Mapping(mapping) => {
            let mut hash = Hash::new();
            for (nested_key, nested_value) in mapping {
                hash.insert(
                    Yaml::String(nested_key.clone()),
                    value_to_yaml(nested_key, nested_value)?,
                );
            }
            Yaml::Hash(hash)
        }
    };
    Ok(yaml)
}
