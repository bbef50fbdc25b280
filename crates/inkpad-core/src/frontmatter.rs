//! Frontmatter parsing and serialization for markdown documents.
//!
//! Documents carry an optional YAML metadata block between `---` delimiter
//! lines at the very start of the file:
//!
//! ```markdown
//! ---
//! title: My Post
//! tags: [draft, rust]
//! ---
//!
//! Body text here...
//! ```
//!
//! Parsing never fails: a missing, unclosed, or malformed block yields an
//! empty map and the raw text as the body.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use serde_yaml::Value as YamlValue;

use crate::error::FrontmatterError;

/// Parsed frontmatter: string keys to JSON values.
pub type Frontmatter = serde_json::Map<String, JsonValue>;

/// A markdown document split into metadata and body.
///
/// Serializes with the wire names `data` and `content`, matching the shape
/// the content endpoints exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Frontmatter key-value pairs. Empty when the file has no block.
    #[serde(rename = "data", default)]
    pub frontmatter: Frontmatter,
    /// Everything after the metadata block.
    #[serde(rename = "content")]
    pub body: String,
}

/// Parse a raw document into frontmatter and body.
///
/// A block is recognized only when the file starts with a `---` line and a
/// matching closing line exists. Valid-but-empty YAML yields an empty map
/// with the body after the block; malformed YAML or a non-mapping value is
/// treated as if there were no block at all, returning the raw input as the
/// body.
#[must_use]
pub fn parse(raw: &str) -> Document {
    let Some((yaml, body)) = split_document(raw) else {
        return Document {
            frontmatter: Frontmatter::new(),
            body: raw.to_string(),
        };
    };

    match serde_yaml::from_str::<YamlValue>(yaml) {
        Ok(YamlValue::Null) => Document {
            frontmatter: Frontmatter::new(),
            body: body.to_string(),
        },
        Ok(YamlValue::Mapping(map)) => Document {
            frontmatter: yaml_mapping_to_json(map),
            body: body.to_string(),
        },
        _ => Document {
            frontmatter: Frontmatter::new(),
            body: raw.to_string(),
        },
    }
}

/// Serialize frontmatter and body back into a raw document.
///
/// The inverse of [`parse`]: an empty map yields the body alone with no
/// delimiters, so `parse(stringify(m, b))` round-trips both halves.
///
/// # Errors
///
/// Returns [`FrontmatterError::Serialize`] if the map cannot be rendered
/// as YAML.
pub fn stringify(frontmatter: &Frontmatter, body: &str) -> Result<String, FrontmatterError> {
    if frontmatter.is_empty() {
        return Ok(body.to_string());
    }

    let mapping = json_map_to_yaml(frontmatter);
    let mut yaml =
        serde_yaml::to_string(&mapping).map_err(|e| FrontmatterError::Serialize {
            reason: e.to_string(),
        })?;
    if !yaml.ends_with('\n') {
        yaml.push('\n');
    }

    Ok(format!("---\n{yaml}---\n{body}"))
}

/// Split off the YAML block, returning `(yaml, body)`.
///
/// `None` when the input does not open with a `---` line or the closing
/// line never appears.
fn split_document(raw: &str) -> Option<(&str, &str)> {
    let rest = raw.strip_prefix("---")?;
    let rest = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix("\n"))?;

    let (close_start, close_end) = find_closing(rest)?;
    Some((&rest[..close_start], &rest[close_end..]))
}

/// Locate the closing `---` line, returning its byte range including the
/// trailing newline. Byte offsets are exact for both `\n` and `\r\n`
/// endings.
fn find_closing(text: &str) -> Option<(usize, usize)> {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        if line.trim_end_matches('\n').trim_end_matches('\r') == "---" {
            return Some((offset, offset + line.len()));
        }
        offset += line.len();
    }
    None
}

fn yaml_mapping_to_json(map: serde_yaml::Mapping) -> Frontmatter {
    map.into_iter()
        .filter_map(|(key, value)| {
            if let YamlValue::String(key) = key {
                Some((key, yaml_to_json(value)))
            } else {
                None
            }
        })
        .collect()
}

fn yaml_to_json(yaml: YamlValue) -> JsonValue {
    match yaml {
        YamlValue::Null => JsonValue::Null,
        YamlValue::Bool(b) => JsonValue::Bool(b),
        YamlValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                JsonValue::Number(i.into())
            } else if let Some(u) = n.as_u64() {
                JsonValue::Number(u.into())
            } else if let Some(f) = n.as_f64() {
                serde_json::Number::from_f64(f)
                    .map(JsonValue::Number)
                    .unwrap_or(JsonValue::Null)
            } else {
                JsonValue::Null
            }
        }
        YamlValue::String(s) => JsonValue::String(s),
        YamlValue::Sequence(seq) => JsonValue::Array(seq.into_iter().map(yaml_to_json).collect()),
        YamlValue::Mapping(map) => JsonValue::Object(yaml_mapping_to_json(map)),
        YamlValue::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn json_map_to_yaml(map: &Frontmatter) -> serde_yaml::Mapping {
    map.iter()
        .map(|(key, value)| (YamlValue::String(key.clone()), json_to_yaml(value)))
        .collect()
}

fn json_to_yaml(json: &JsonValue) -> YamlValue {
    match json {
        JsonValue::Null => YamlValue::Null,
        JsonValue::Bool(b) => YamlValue::Bool(*b),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                YamlValue::Number(i.into())
            } else if let Some(u) = n.as_u64() {
                YamlValue::Number(u.into())
            } else if let Some(f) = n.as_f64() {
                YamlValue::Number(f.into())
            } else {
                YamlValue::Null
            }
        }
        JsonValue::String(s) => YamlValue::String(s.clone()),
        JsonValue::Array(items) => {
            YamlValue::Sequence(items.iter().map(json_to_yaml).collect())
        }
        JsonValue::Object(map) => YamlValue::Mapping(json_map_to_yaml(map)),
    }
}
