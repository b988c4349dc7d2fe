//! Register map document loader
//!
//! Turns document text into a typed declaration tree. Only the shape of the document is checked
//! here; the invariants of the register map are left to the validator.

use lazy_static::lazy_static;
use regex::Regex;

use crate::{
    error::{Malformation, MalformedDocument},
    frontend::document::{index_path, key_path, DocValue, ROOT},
};

/// Top-level register map declaration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpecDocument {
    pub version: Option<u64>,
    pub blocks: Vec<BlockDecl>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockDecl {
    pub name: String,
    pub base: u32,
    pub registers: Vec<RegisterDecl>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisterDecl {
    /// `None` when the name is absent or empty
    pub name: Option<String>,
    pub offset: u32,
    pub access: String,
    pub reset: Option<u64>,
    pub desc: Option<String>,
    pub fields: Vec<FieldDecl>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDecl {
    /// `None` when the name is absent or empty
    pub name: Option<String>,
    /// Raw `[msb, lsb]` value, shape is checked when the model is built. `Null` if absent.
    pub bits: DocValue,
    pub access: String,
    pub reset: Option<u64>,
}

/// A mapping in the document together with its path, for error reporting
struct MapNode<'a> {
    path: String,
    entries: &'a [(String, DocValue)],
}

impl<'a> MapNode<'a> {
    fn from_value(value: &'a DocValue, path: String) -> Result<Self, MalformedDocument> {
        match value {
            DocValue::Mapping(entries) => Ok(Self { path, entries }),
            other => Err(unexpected(&path, "mapping", other)),
        }
    }

    fn find_by_key(&self, key: &str) -> Result<(&'a DocValue, String), MalformedDocument> {
        self.maybe_find_by_key(key).ok_or_else(|| {
            MalformedDocument::new(self.path.clone(), Malformation::MissingKey(key.to_owned()))
        })
    }

    /// `null` values are treated as absent
    fn maybe_find_by_key(&self, key: &str) -> Option<(&'a DocValue, String)> {
        self.entries
            .iter()
            .find(|(k, v)| k == key && *v != DocValue::Null)
            .map(|(_, v)| (v, key_path(&self.path, key)))
    }

    fn string(&self, key: &str) -> Result<String, MalformedDocument> {
        let (value, path) = self.find_by_key(key)?;
        as_string(value, &path)
    }

    fn maybe_string(&self, key: &str) -> Result<Option<String>, MalformedDocument> {
        self.maybe_find_by_key(key)
            .map(|(value, path)| as_string(value, &path))
            .transpose()
    }

    fn u32(&self, key: &str) -> Result<u32, MalformedDocument> {
        let (value, path) = self.find_by_key(key)?;
        let n = parse_uint(value, &path)?;
        u32::try_from(n).map_err(|_| MalformedDocument::new(path, Malformation::OutOfRange(n)))
    }

    fn maybe_uint(&self, key: &str) -> Result<Option<u64>, MalformedDocument> {
        self.maybe_find_by_key(key)
            .map(|(value, path)| parse_uint(value, &path))
            .transpose()
    }

    /// Sequence of mappings under `key`, empty if the key is absent
    fn children(&self, key: &str) -> Result<Vec<MapNode<'a>>, MalformedDocument> {
        match self.maybe_find_by_key(key) {
            None => Ok(vec![]),
            Some((DocValue::Sequence(items), path)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| MapNode::from_value(item, index_path(&path, i)))
                .collect(),
            Some((other, path)) => Err(unexpected(&path, "sequence", other)),
        }
    }
}

fn unexpected(path: &str, expected: &'static str, found: &DocValue) -> MalformedDocument {
    MalformedDocument::new(
        path,
        Malformation::UnexpectedType {
            expected,
            found: found.kind(),
        },
    )
}

fn as_string(value: &DocValue, path: &str) -> Result<String, MalformedDocument> {
    match value {
        DocValue::String(s) => Ok(s.clone()),
        other => Err(unexpected(path, "string", other)),
    }
}

/// Parses an unsigned integer from text
///
/// Accepts `0x`/`0X`-prefixed hexadecimal and plain decimal, with optional `_` digit separators.
pub(crate) fn parse_uint_str(text: &str) -> Option<u64> {
    // Compile Regexes only once as recommended by the documentation of the Regex crate
    lazy_static! {
        /// Hexadecimal with a mandatory prefix, e.g., `0x0000_0100`
        static ref HEX_UINT_RE: Regex = Regex::new(
            r"(?x)
            ^(?:0x|0X)          # hexadecimal prefix
            ([[:xdigit:]_]+)$   # hexadecimal digits and separators (captured as #1)
        ").unwrap();

        /// Plain decimal, e.g., `256` or `1_000`
        static ref DEC_UINT_RE: Regex = Regex::new(
            r"(?x)
            ^([[:digit:]_]+)$   # decimal digits and separators (captured as #1)
        ").unwrap();
    }

    let text = text.trim();
    let (digits, radix) = if let Some(captures) = HEX_UINT_RE.captures(text) {
        (captures.get(1)?.as_str(), 16)
    } else if let Some(captures) = DEC_UINT_RE.captures(text) {
        (captures.get(1)?.as_str(), 10)
    } else {
        return None;
    };
    u64::from_str_radix(&digits.replace('_', ""), radix).ok()
}

#[test]
fn parse_uint_str_works() {
    assert_eq!(parse_uint_str("0x0000_0100"), Some(0x100));
    assert_eq!(parse_uint_str("0XFFB00000"), Some(0xFFB0_0000));
    assert_eq!(parse_uint_str("42"), Some(42));
    assert_eq!(parse_uint_str(" 1_024 "), Some(1024));
    assert_eq!(parse_uint_str("0x"), None);
    assert_eq!(parse_uint_str("0x_"), None);
    assert_eq!(parse_uint_str("-4"), None);
    assert_eq!(parse_uint_str("ff"), None);
    assert_eq!(parse_uint_str("0x1_0000_0000_0000_0000"), None);
}

/// Normalizes an integer-valued document entry to an unsigned integer
fn parse_uint(value: &DocValue, path: &str) -> Result<u64, MalformedDocument> {
    match value {
        DocValue::Integer(n) => u64::try_from(*n).map_err(|_| {
            MalformedDocument::new(path, Malformation::InvalidInteger(n.to_string()))
        }),
        DocValue::String(s) => parse_uint_str(s)
            .ok_or_else(|| MalformedDocument::new(path, Malformation::InvalidInteger(s.clone()))),
        other => Err(unexpected(path, "integer", other)),
    }
}

fn load_field(node: &MapNode) -> Result<FieldDecl, MalformedDocument> {
    Ok(FieldDecl {
        name: node.maybe_string("name")?.filter(|name| !name.is_empty()),
        bits: node
            .maybe_find_by_key("bits")
            .map_or(DocValue::Null, |(bits, _)| bits.clone()),
        access: node.string("access")?,
        reset: node.maybe_uint("reset")?,
    })
}

fn load_register(node: &MapNode) -> Result<RegisterDecl, MalformedDocument> {
    Ok(RegisterDecl {
        name: node.maybe_string("name")?.filter(|name| !name.is_empty()),
        offset: node.u32("offset")?,
        access: node.string("access")?,
        reset: node.maybe_uint("reset")?,
        desc: node.maybe_string("desc")?,
        fields: node
            .children("fields")?
            .iter()
            .map(load_field)
            .collect::<Result<_, _>>()?,
    })
}

fn load_block(node: &MapNode) -> Result<BlockDecl, MalformedDocument> {
    Ok(BlockDecl {
        name: node.string("name")?,
        base: node.u32("base")?,
        registers: node
            .children("registers")?
            .iter()
            .map(load_register)
            .collect::<Result<_, _>>()?,
    })
}

/// Load a register map declaration from a parsed document tree
///
/// # Errors
///
/// - The top-level value is not a mapping or has no `blocks` sequence
/// - Any block, register or field is of the wrong type or misses a required key
pub fn load_regmap_value(doc: &DocValue) -> Result<SpecDocument, MalformedDocument> {
    let root = MapNode::from_value(doc, ROOT.to_owned())?;
    // `blocks` is required even though `children` would accept its absence
    root.find_by_key("blocks")?;
    Ok(SpecDocument {
        version: root.maybe_uint("version")?,
        blocks: root
            .children("blocks")?
            .iter()
            .map(load_block)
            .collect::<Result<_, _>>()?,
    })
}

/// Load a register map declaration from document text
///
/// # Errors
///
/// - The text is not a valid document
/// - See [`load_regmap_value`]
pub fn load_regmap(text: &str) -> Result<SpecDocument, MalformedDocument> {
    load_regmap_value(&DocValue::parse(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_integer_representations() {
        let doc = load_regmap(
            r#"{
                "version": 1,
                "blocks": [
                    { "name": "CORE", "base": "0x0000_0100", "registers": [
                        { "name": "ID", "offset": 0, "access": "ro", "reset": "0xCAFE" },
                        { "name": "CTRL", "offset": "4", "access": "rw", "desc": "control",
                          "fields": [ { "name": "EN", "bits": [0, 0], "access": "rw", "reset": 1 } ] }
                    ] }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(doc.version, Some(1));
        let core = &doc.blocks[0];
        assert_eq!(core.base, 0x100);
        assert_eq!(core.registers[0].offset, 0);
        assert_eq!(core.registers[0].reset, Some(0xCAFE));
        assert_eq!(core.registers[0].fields, vec![]);
        assert_eq!(core.registers[1].offset, 4);
        assert_eq!(core.registers[1].desc.as_deref(), Some("control"));
        assert_eq!(core.registers[1].fields[0].reset, Some(1));
    }

    #[test]
    fn top_level_must_be_a_mapping_with_blocks() {
        let err = load_regmap("[1, 2]").unwrap_err();
        assert_eq!(err.path, ROOT);
        assert_eq!(
            err.kind,
            Malformation::UnexpectedType {
                expected: "mapping",
                found: "sequence"
            }
        );

        let err = load_regmap(r#"{ "version": 1 }"#).unwrap_err();
        assert_eq!(err.kind, Malformation::MissingKey("blocks".to_owned()));

        let err = load_regmap(r#"{ "blocks": {} }"#).unwrap_err();
        assert_eq!(err.path, "blocks");
    }

    #[test]
    fn structural_problems_fail_the_whole_load() {
        let err = load_regmap(
            r#"{ "blocks": [
                { "name": "A", "base": 0, "registers": [] },
                { "name": "B", "base": 4096, "registers": [ { "name": "X", "access": "rw" } ] }
            ] }"#,
        )
        .unwrap_err();
        assert_eq!(err.path, "blocks[1].registers[0]");
        assert_eq!(err.kind, Malformation::MissingKey("offset".to_owned()));

        let err = load_regmap(
            r#"{ "blocks": [ { "name": "A", "base": "0xZZ" } ] }"#,
        )
        .unwrap_err();
        assert_eq!(err.path, "blocks[0].base");
        assert_eq!(err.kind, Malformation::InvalidInteger("0xZZ".to_owned()));

        let err = load_regmap(
            r#"{ "blocks": [ { "name": "A", "base": "0x1_0000_0000" } ] }"#,
        )
        .unwrap_err();
        assert_eq!(err.kind, Malformation::OutOfRange(0x1_0000_0000));

        let err = load_regmap(
            r#"{ "blocks": [ { "name": "A", "base": 0, "registers": [
                { "name": "X", "offset": -4, "access": "rw" } ] } ] }"#,
        )
        .unwrap_err();
        assert_eq!(err.path, "blocks[0].registers[0].offset");
    }

    #[test]
    fn missing_field_name_and_bits_are_left_to_the_builder() {
        let doc = load_regmap(
            r#"{ "blocks": [ { "name": "A", "base": 0, "registers": [
                { "name": "CTRL", "offset": 0, "access": "rw", "fields": [
                    { "bits": [0, 0], "access": "rw" },
                    { "name": "MODE", "access": "rw" } ] } ] } ] }"#,
        )
        .unwrap();
        let fields = &doc.blocks[0].registers[0].fields;
        assert_eq!(fields[0].name, None);
        assert_eq!(fields[1].name.as_deref(), Some("MODE"));
        assert_eq!(fields[1].bits, DocValue::Null);
    }

    #[test]
    fn missing_register_name_is_left_to_the_builder() {
        let doc = load_regmap(
            r#"{ "blocks": [ { "name": "A", "base": 0, "registers": [
                { "offset": 0, "access": "rw" },
                { "name": "", "offset": 4, "access": "rw" } ] } ] }"#,
        )
        .unwrap();
        assert!(doc.blocks[0].registers.iter().all(|r| r.name.is_none()));
    }
}
