//! Generic document tree consumed by the register map loader

use json::JsonValue;

use crate::error::{Malformation, MalformedDocument};

/// Path used for errors that concern the document as a whole
pub(crate) const ROOT: &str = "<root>";

/// Any value that can appear in a register map document
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DocValue {
    Null,
    Integer(i128),
    String(String),
    Sequence(Vec<DocValue>),
    /// Key-value pairs in document order
    Mapping(Vec<(String, DocValue)>),
}

impl DocValue {
    /// Parse a JSON document into a [`DocValue`] tree
    pub fn parse(text: &str) -> Result<Self, MalformedDocument> {
        let json = json::parse(text)
            .map_err(|e| MalformedDocument::new(ROOT, Malformation::Syntax(e.to_string())))?;
        Self::from_json(&json, ROOT)
    }

    fn from_json(value: &JsonValue, path: &str) -> Result<Self, MalformedDocument> {
        Ok(match value {
            JsonValue::Null => Self::Null,
            JsonValue::Short(s) => Self::String(s.as_str().to_owned()),
            JsonValue::String(s) => Self::String(s.clone()),
            JsonValue::Number(number) => integer_value(*number).map(Self::Integer).ok_or_else(|| {
                MalformedDocument::new(
                    path,
                    Malformation::UnsupportedValue(format!("non-integer number {value}")),
                )
            })?,
            JsonValue::Boolean(b) => {
                return Err(MalformedDocument::new(
                    path,
                    Malformation::UnsupportedValue(format!("boolean {b}")),
                ))
            }
            JsonValue::Array(items) => Self::Sequence(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| Self::from_json(item, &index_path(path, i)))
                    .collect::<Result<_, _>>()?,
            ),
            JsonValue::Object(object) => Self::Mapping(
                object
                    .iter()
                    .map(|(key, item)| {
                        Self::from_json(item, &key_path(path, key)).map(|v| (key.to_owned(), v))
                    })
                    .collect::<Result<_, _>>()?,
            ),
        })
    }

    /// Human readable name of the variant, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Integer(_) => "integer",
            Self::String(_) => "string",
            Self::Sequence(_) => "sequence",
            Self::Mapping(_) => "mapping",
        }
    }

    /// Look up `key` in a mapping, returning `None` for other variants
    pub fn get(&self, key: &str) -> Option<&DocValue> {
        match self {
            Self::Mapping(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }
}

/// Exact integer value of a JSON number, `None` if it has a fractional part
fn integer_value(number: json::number::Number) -> Option<i128> {
    let (positive, mantissa, exponent) = number.as_parts();
    let scale = 10i128.checked_pow(u32::from(exponent.unsigned_abs()))?;
    let mantissa = i128::from(mantissa);
    let magnitude = if exponent >= 0 {
        mantissa.checked_mul(scale)?
    } else if mantissa % scale == 0 {
        mantissa / scale
    } else {
        return None;
    };
    Some(if positive { magnitude } else { -magnitude })
}

/// E.g., `blocks` + `name` -> `blocks.name`
pub(crate) fn key_path(parent: &str, key: &str) -> String {
    if parent == ROOT {
        key.to_owned()
    } else {
        format!("{parent}.{key}")
    }
}

/// E.g., `blocks` + 1 -> `blocks[1]`
pub(crate) fn index_path(parent: &str, index: usize) -> String {
    format!("{parent}[{index}]")
}

#[test]
fn parses_nested_values_in_order() {
    let doc = DocValue::parse(r#"{ "b": [1, "0x10", null], "a": { "x": -3 } }"#).unwrap();
    let DocValue::Mapping(entries) = &doc else {
        panic!("expected mapping, got {doc:?}");
    };
    let keys: Vec<_> = entries.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(keys, ["b", "a"]);
    assert_eq!(
        doc.get("b"),
        Some(&DocValue::Sequence(vec![
            DocValue::Integer(1),
            DocValue::String("0x10".to_owned()),
            DocValue::Null,
        ]))
    );
    assert_eq!(doc.get("a").and_then(|a| a.get("x")), Some(&DocValue::Integer(-3)));
    assert_eq!(doc.get("missing"), None);
}

#[test]
fn rejects_values_outside_the_document_model() {
    let err = DocValue::parse(r#"{ "blocks": [ { "base": 1.5 } ] }"#).unwrap_err();
    assert_eq!(err.path, "blocks[0].base");
    assert!(matches!(err.kind, Malformation::UnsupportedValue(_)));

    let err = DocValue::parse(r#"{ "version": true }"#).unwrap_err();
    assert_eq!(err.path, "version");

    let err = DocValue::parse("{ not json").unwrap_err();
    assert_eq!(err.path, ROOT);
    assert!(matches!(err.kind, Malformation::Syntax(_)));
}
