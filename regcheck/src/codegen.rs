//! Generate constant definitions from a validated [`RegisterMap`]
//!
//! Output is deterministic, there are no timestamps, so generated files can be diffed against
//! committed copies.
mod c_header;
mod sv_package;

pub(crate) use c_header::emit_c_header;
pub(crate) use sv_package::emit_sv_package;

use crate::model::{Field, RegisterMap};

/// Naming used by the emitters
#[derive(Clone, Debug)]
pub struct GenConfig {
    /// Prefix of every generated symbol, e.g., `HOMEINV` -> `HOMEINV_REG_CTRL`
    prefix: String,
    /// Name of the generated SystemVerilog package
    package_name: String,
    /// File name written on the first banner line of the C header
    header_name: String,
    /// Where the register map came from, written into the banner
    source_label: String,
}

impl GenConfig {
    pub const DEFAULT_PREFIX: &'static str = "HOMEINV";
    pub const DEFAULT_PACKAGE_NAME: &'static str = "home_inventory_regmap_pkg";
    pub const DEFAULT_HEADER_NAME: &'static str = "home_inventory_regmap.h";

    #[must_use]
    pub fn new(source_label: impl Into<String>) -> Self {
        Self {
            prefix: Self::DEFAULT_PREFIX.to_owned(),
            package_name: Self::DEFAULT_PACKAGE_NAME.to_owned(),
            header_name: Self::DEFAULT_HEADER_NAME.to_owned(),
            source_label: source_label.into(),
        }
    }

    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn package_name(mut self, package_name: impl Into<String>) -> Self {
        self.package_name = package_name.into();
        self
    }

    #[must_use]
    pub fn header_name(mut self, header_name: impl Into<String>) -> Self {
        self.header_name = header_name.into();
        self
    }

    #[must_use]
    pub fn source_label(mut self, source_label: impl Into<String>) -> Self {
        self.source_label = source_label.into();
        self
    }
}

/// Layout of one field as emitted by both generators
enum FieldLayout {
    /// `[n:n]`, emitted as a bit index
    Bit(i64),
    /// Emitted as the lowest bit and a mask
    Range { lsb: i64, mask: u32 },
}

impl FieldLayout {
    /// `None` for bit ranges a validated map cannot contain
    fn of(field: &Field) -> Option<Self> {
        let mask = field.bits.mask()?;
        Some(if field.bits.msb == field.bits.lsb {
            Self::Bit(field.bits.lsb)
        } else {
            Self::Range {
                lsb: field.bits.lsb,
                mask,
            }
        })
    }
}

/// Registers in address order, each with its emittable fields
fn layout(map: &RegisterMap) -> Vec<(&str, u64, Vec<(&str, FieldLayout)>)> {
    map.sorted_by_addr()
        .into_iter()
        .map(|reg| {
            let fields = reg
                .fields
                .iter()
                .filter_map(|f| FieldLayout::of(f).map(|l| (f.name.as_str(), l)))
                .collect();
            (reg.name.as_str(), reg.full_addr(), fields)
        })
        .collect()
}

#[cfg(test)]
fn sample_map() -> RegisterMap {
    let doc = crate::frontend::load_regmap(indoc::indoc! {r#"
        { "version": 1, "blocks": [
            { "name": "CTRL", "base": "0x100", "registers": [
                { "name": "CTRL", "offset": 0, "access": "rw", "desc": "Control", "fields": [
                    { "name": "ENABLE", "bits": [0, 0], "access": "rw" },
                    { "name": "MODE", "bits": [7, 4], "access": "rw" } ] } ] },
            { "name": "CORE", "base": 0, "registers": [
                { "name": "ID", "offset": 0, "access": "ro", "desc": "Identifier" } ] }
        ] }
    "#})
    .unwrap();
    crate::model::build_register_map(&doc, &mut Default::default())
}
