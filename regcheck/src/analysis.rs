//! Static validation of a register map
//!
//! All checks run to completion and record their findings in a [`Diagnostics`] accumulator, so
//! that a single run reports every independent problem.

use std::collections::{hash_map::Entry, HashMap};

use log::info;

use crate::{
    error::Hex32,
    frontend::SpecDocument,
    model::{
        self, low_bits, Block, Category, Declared, Diagnostic, Diagnostics, Field, FieldAccess,
        Register, RegisterAccess, RegisterMap,
    },
};

/// Outcome of validating one register map document
#[derive(Clone, Debug)]
pub struct ValidationReport {
    map: RegisterMap,
    diagnostics: Diagnostics,
}

impl ValidationReport {
    /// The flattened registers, including the ones that failed a check
    pub fn register_map(&self) -> &RegisterMap {
        &self.map
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.errors()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.warnings()
    }

    /// True when no error was recorded. Warnings do not count.
    pub fn is_success(&self) -> bool {
        !self.diagnostics.has_errors()
    }
}

/// Build the register map of `doc` and check it against every invariant
pub fn validate_document(doc: &SpecDocument) -> ValidationReport {
    let mut diags = Diagnostics::default();
    let map = model::build_register_map(doc, &mut diags);

    for block in map.blocks() {
        check_block(block, &mut diags);
    }
    for reg in map.iter() {
        check_register(reg, &mut diags);
    }
    check_address_collisions(&map, &mut diags);
    check_naming(&map, &mut diags);

    info!(
        "Validated {} registers: {} errors, {} warnings.",
        map.len(),
        diags.errors().count(),
        diags.warnings().count()
    );
    ValidationReport {
        map,
        diagnostics: diags,
    }
}

fn check_block(block: &Block, diags: &mut Diagnostics) {
    if block.base % 4 != 0 {
        diags.error(
            Category::Alignment,
            &block.name,
            format!(
                "{}: base address {} not 32-bit aligned",
                block.name,
                Hex32(block.base.into())
            ),
        );
    }
}

fn check_register(reg: &Register, diags: &mut Diagnostics) {
    let uid = reg.uid();

    match reg.addr.to_bus_addr(&uid) {
        Ok(addr) if addr % 4 != 0 => diags.error(
            Category::Alignment,
            &uid,
            format!("{uid}: address {} not 32-bit aligned", Hex32(addr.into())),
        ),
        Ok(_) if reg.addr.offset() % 4 != 0 => diags.error(
            Category::Alignment,
            &uid,
            format!(
                "{uid}: offset {} not 32-bit aligned",
                Hex32(reg.addr.offset().into())
            ),
        ),
        Ok(_) => {}
        Err(_) => diags.error(
            Category::AddressRange,
            &uid,
            format!(
                "{uid}: address {} ({}) does not fit in 32 bits",
                Hex32(reg.full_addr()),
                reg.addr
            ),
        ),
    }

    if let Declared::Unknown(access) = &reg.access {
        diags.error(
            Category::Access,
            &uid,
            format!(
                "{uid}: unknown register access '{access}', expected one of {}",
                RegisterAccess::spellings()
            ),
        );
    }

    if let Some(reset) = reg.reset {
        if u32::try_from(reset).is_err() {
            diags.error(
                Category::Reset,
                &uid,
                format!("{uid}: reset value {reset:#x} does not fit in 32 bits"),
            );
        }
    }

    check_fields(reg, &uid, diags);
}

/// Checks fields one by one in declaration order
///
/// Overlap is tracked with a running mask of the bits claimed so far, so a field overlapping
/// several earlier fields is reported once.
fn check_fields(reg: &Register, uid: &str, diags: &mut Diagnostics) {
    let mut used_mask = 0u32;
    for field in &reg.fields {
        let fqn = format!("{uid}.{}", field.name);

        check_field_access(reg, field, &fqn, diags);

        let Some(mask) = check_bit_range(field, &fqn, diags) else {
            continue;
        };
        if used_mask & mask != 0 {
            diags.error(
                Category::FieldOverlap,
                uid,
                format!("{uid}: field overlap at {} ({})", field.name, field.bits),
            );
        }
        used_mask |= mask;

        check_field_reset(reg, field, &fqn, diags);
    }
}

/// Returns the field mask if the bit range is valid
fn check_bit_range(field: &Field, fqn: &str, diags: &mut Diagnostics) -> Option<u32> {
    let bits = field.bits;
    if !bits.in_bounds() {
        diags.error(
            Category::BitRange,
            fqn,
            format!("{fqn}: bit range out of 0..31: {bits}"),
        );
    } else if !bits.is_ordered() {
        diags.error(Category::BitRange, fqn, format!("{fqn}: msb<lsb: {bits}"));
    }
    bits.mask()
}

fn check_field_access(reg: &Register, field: &Field, fqn: &str, diags: &mut Diagnostics) {
    match (&reg.access, &field.access) {
        (_, Declared::Unknown(access)) => diags.error(
            Category::Access,
            fqn,
            format!(
                "{fqn}: unknown field access '{access}', expected one of {}",
                FieldAccess::spellings()
            ),
        ),
        (Declared::Known(reg_access), Declared::Known(field_access))
            if !reg_access.allows(*field_access) =>
        {
            diags.error(
                Category::Access,
                fqn,
                format!(
                    "{fqn}: field access '{field_access}' not allowed in '{reg_access}' register, expected one of {}",
                    itertools::join(reg_access.allowed_field_access(), ", ")
                ),
            )
        }
        _ => {}
    }
}

/// Expects a valid bit range on `field`
fn check_field_reset(reg: &Register, field: &Field, fqn: &str, diags: &mut Diagnostics) {
    let Some(reset) = field.reset else {
        return;
    };
    let Some(width) = field.bits.width() else {
        return;
    };

    // The 32-bit range is checked before the width so that the two reports stay distinct
    let Ok(reset) = u32::try_from(reset) else {
        diags.error(
            Category::Reset,
            fqn,
            format!("{fqn}: reset value {reset:#x} does not fit in 32 bits"),
        );
        return;
    };
    if reset > low_bits(width) {
        diags.error(
            Category::Reset,
            fqn,
            format!("{fqn}: reset value {reset:#x} does not fit in {width}-bit field"),
        );
        return;
    }

    let Some(reg_reset) = reg.reset.and_then(|r| u32::try_from(r).ok()) else {
        return;
    };
    if let Some(window) = field.bits.extract(reg_reset) {
        if window != reset {
            diags.error(
                Category::Reset,
                fqn,
                format!(
                    "{fqn}: reset disagreement, register reset {} has {window:#x} at [{}], field declares {reset:#x}",
                    Hex32(reg_reset.into()),
                    field.bits
                ),
            );
        }
    }
}

fn check_address_collisions(map: &RegisterMap, diags: &mut Diagnostics) {
    let mut addresses: HashMap<u64, String> = HashMap::new();
    for reg in map.iter() {
        match addresses.entry(reg.full_addr()) {
            Entry::Vacant(entry) => {
                entry.insert(reg.uid());
            }
            Entry::Occupied(holder) => {
                let uid = reg.uid();
                diags.error(
                    Category::AddressCollision,
                    &uid,
                    format!(
                        "Address collision: {} used by {} and {uid}",
                        Hex32(reg.full_addr()),
                        holder.get()
                    ),
                );
            }
        }
    }
}

/// Soft checks: name reuse and missing descriptions
fn check_naming(map: &RegisterMap, diags: &mut Diagnostics) {
    let mut names: HashMap<&str, String> = HashMap::new();
    for reg in map.iter() {
        let uid = reg.uid();
        match names.entry(&reg.name) {
            Entry::Vacant(entry) => {
                entry.insert(uid.clone());
            }
            Entry::Occupied(first) => diags.warning(
                Category::Naming,
                &uid,
                format!(
                    "register name {} reused by {} and {uid}",
                    reg.name,
                    first.get()
                ),
            ),
        }
        if reg.desc.as_deref().map_or(true, |d| d.trim().is_empty()) {
            diags.warning(
                Category::Documentation,
                &uid,
                format!("{uid}: missing description"),
            );
        }
    }
}
