//! Readers for the two inputs: the register map document and the HDL source

pub(crate) mod document;
pub(crate) mod hdl;
pub(crate) mod regmap;

pub use document::DocValue;
pub use hdl::{
    expand_includes, extract_addresses, extract_from_source, AddressPattern, ExpandedSource,
    ExternalAddressEntry, SourceLocation, DEFAULT_TAG,
};
pub use regmap::{load_regmap, load_regmap_value, BlockDecl, FieldDecl, RegisterDecl, SpecDocument};
