//! Flattens block, register and field declarations into a [`RegisterMap`]

use log::{debug, info};

use crate::{
    frontend::{
        document::DocValue,
        regmap::{parse_uint_str, BlockDecl, FieldDecl, RegisterDecl, SpecDocument},
    },
    model::{
        AddrRepr, BitRange, Block, Category, Declared, Diagnostics, Field, Register, RegisterMap,
    },
};

/// Reads one `[msb, lsb]` element
fn bit_index(value: &DocValue) -> Option<i64> {
    match value {
        DocValue::Integer(n) => i64::try_from(*n).ok(),
        DocValue::String(s) => parse_uint_str(s).and_then(|n| i64::try_from(n).ok()),
        _ => None,
    }
}

fn bit_range(value: &DocValue) -> Option<BitRange> {
    match value {
        DocValue::Sequence(items) if items.len() == 2 => {
            Some(BitRange::new(bit_index(&items[0])?, bit_index(&items[1])?))
        }
        _ => None,
    }
}

fn build_field(
    decl: &FieldDecl,
    index: usize,
    reg_uid: &str,
    diags: &mut Diagnostics,
) -> Option<Field> {
    let Some(name) = &decl.name else {
        diags.error(
            Category::Structure,
            format!("{reg_uid}.<field #{index}>"),
            format!("{reg_uid}: field #{index} missing name"),
        );
        return None;
    };
    let fqn = format!("{reg_uid}.{name}");
    let Some(bits) = bit_range(&decl.bits) else {
        diags.error(
            Category::Structure,
            &fqn,
            format!("{fqn}: bits must be [msb, lsb]"),
        );
        return None;
    };
    Some(Field {
        name: name.clone(),
        bits,
        access: Declared::from_spelling(&decl.access),
        reset: decl.reset,
    })
}

fn build_register(
    block: &BlockDecl,
    index: usize,
    decl: &RegisterDecl,
    diags: &mut Diagnostics,
) -> Option<Register> {
    let Some(name) = &decl.name else {
        let entity = format!("{}.<register #{index}>", block.name);
        diags.error(
            Category::Structure,
            entity,
            format!("Block {}: register #{index} missing name", block.name),
        );
        debug!("skipping register #{index} of block {}", block.name);
        return None;
    };
    let uid = format!("{}.{name}", block.name);
    let fields = decl
        .fields
        .iter()
        .enumerate()
        .filter_map(|(i, f)| build_field(f, i, &uid, diags))
        .collect();
    Some(Register {
        block: block.name.clone(),
        name: name.clone(),
        addr: AddrRepr::new(block.base, decl.offset),
        access: Declared::from_spelling(&decl.access),
        reset: decl.reset,
        desc: decl.desc.clone(),
        fields,
    })
}

/// Flatten `doc` into a register map
///
/// Registers and fields without a name, and fields with a missing or malformed bit range, are
/// recorded in `diags` and left out; everything else is kept in document order.
pub(crate) fn build_register_map(doc: &SpecDocument, diags: &mut Diagnostics) -> RegisterMap {
    let blocks = doc
        .blocks
        .iter()
        .map(|b| Block {
            name: b.name.clone(),
            base: b.base,
        })
        .collect();
    let registers = doc
        .blocks
        .iter()
        .flat_map(|block| {
            block
                .registers
                .iter()
                .enumerate()
                .map(move |(i, decl)| (block, i, decl))
        })
        .filter_map(|(block, i, decl)| build_register(block, i, decl, diags))
        .collect::<Vec<_>>();

    info!(
        "Found {} registers in {} blocks.",
        registers.len(),
        doc.blocks.len()
    );
    RegisterMap::new(blocks, registers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::regmap::load_regmap;

    fn build(text: &str) -> (RegisterMap, Diagnostics) {
        let doc = load_regmap(text).unwrap();
        let mut diags = Diagnostics::default();
        let map = build_register_map(&doc, &mut diags);
        (map, diags)
    }

    #[test]
    fn address_is_base_plus_offset_in_any_block_order() {
        let (map, diags) = build(
            r#"{ "blocks": [
                { "name": "ADC", "base": "0x200", "registers": [
                    { "name": "ADC_CFG", "offset": "0x0", "access": "rw" },
                    { "name": "ADC_CMD", "offset": "0x4", "access": "rw" } ] },
                { "name": "CORE", "base": 0, "registers": [
                    { "name": "ID", "offset": 0, "access": "ro" } ] }
            ] }"#,
        );
        assert!(diags.is_empty());
        let addrs: Vec<_> = map.iter().map(|r| (r.uid(), r.full_addr())).collect();
        assert_eq!(
            addrs,
            [
                ("ADC.ADC_CFG".to_owned(), 0x200),
                ("ADC.ADC_CMD".to_owned(), 0x204),
                ("CORE.ID".to_owned(), 0x0),
            ]
        );
        for r in map.iter() {
            assert_eq!(r.full_addr(), u64::from(r.addr.base()) + u64::from(r.addr.offset()));
        }
        assert_eq!(map.blocks().len(), 2);
        assert_eq!(map.sorted_by_addr()[0].name, "ID");
    }

    #[test]
    fn unnamed_registers_are_reported_and_skipped() {
        let (map, diags) = build(
            r#"{ "blocks": [ { "name": "CORE", "base": 0, "registers": [
                { "offset": 0, "access": "ro" },
                { "name": "CTRL", "offset": 4, "access": "rw" } ] } ] }"#,
        );
        assert_eq!(map.len(), 1);
        assert_eq!(map[0].name, "CTRL");
        assert_eq!(diags.count(Category::Structure), 1);
        assert!(diags.errors().next().unwrap().message.contains("missing name"));
    }

    #[test]
    fn malformed_bits_are_reported_and_skipped() {
        let (map, diags) = build(
            r#"{ "blocks": [ { "name": "CORE", "base": 0, "registers": [
                { "name": "CTRL", "offset": 0, "access": "rw", "fields": [
                    { "name": "A", "bits": [3], "access": "rw" },
                    { "name": "B", "bits": "7:4", "access": "rw" },
                    { "name": "C", "bits": ["9", 8], "access": "rw" },
                    { "name": "D", "bits": [40, -1], "access": "rw" } ] } ] } ] }"#,
        );
        let fields: Vec<_> = map[0].fields.iter().map(|f| (f.name.as_str(), f.bits)).collect();
        assert_eq!(
            fields,
            [("C", BitRange::new(9, 8)), ("D", BitRange::new(40, -1))]
        );
        assert_eq!(diags.count(Category::Structure), 2);
        assert_eq!(diags.iter().next().unwrap().entity, "CORE.CTRL.A");
    }

    #[test]
    fn fields_without_name_or_bits_are_reported_and_skipped() {
        let (map, diags) = build(
            r#"{ "blocks": [ { "name": "CORE", "base": 0, "registers": [
                { "name": "CTRL", "offset": 0, "access": "rw", "fields": [
                    { "bits": [0, 0], "access": "rw" },
                    { "name": "MODE", "access": "rw" },
                    { "name": "EN", "bits": [1, 1], "access": "rw" } ] },
                { "name": "STATUS", "offset": 4, "access": "ro" } ] } ] }"#,
        );
        assert_eq!(map.len(), 2);
        let names: Vec<_> = map[0].fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["EN"]);

        let found: Vec<_> = diags.errors().map(|d| (d.entity.as_str(), d.message.as_str())).collect();
        assert_eq!(
            found,
            [
                ("CORE.CTRL.<field #0>", "CORE.CTRL: field #0 missing name"),
                ("CORE.CTRL.MODE", "CORE.CTRL.MODE: bits must be [msb, lsb]"),
            ]
        );
        assert_eq!(diags.count(Category::Structure), 2);
    }
}
