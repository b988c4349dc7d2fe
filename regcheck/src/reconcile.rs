//! Compare the register map address table against one read from HDL

use std::{
    collections::{btree_map::Entry, BTreeMap},
    fmt,
};

use itertools::{EitherOrBoth, Itertools};
use log::info;

use crate::{
    error::{Hex32, ReconcileError},
    frontend::ExternalAddressEntry,
    model::{Diagnostics, RegisterMap},
};

/// Name-indexed table of 32-bit register addresses, ordered by key
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AddressTable(BTreeMap<String, u64>);

impl AddressTable {
    /// Key every register in `map` as `<tag><register name>`
    ///
    /// # Errors
    ///
    /// - Two registers, e.g., in different blocks, produce the same key
    pub fn from_registers(map: &RegisterMap, tag: &str) -> Result<Self, ReconcileError> {
        let mut table = BTreeMap::new();
        let mut owners = BTreeMap::new();
        for reg in map.iter() {
            let key = format!("{tag}{}", reg.name);
            match owners.entry(key.clone()) {
                Entry::Vacant(entry) => {
                    entry.insert(reg.uid());
                    table.insert(key, reg.full_addr());
                }
                Entry::Occupied(first) => {
                    return Err(ReconcileError::AmbiguousName {
                        key,
                        first: first.get().clone(),
                        second: reg.uid(),
                    })
                }
            }
        }
        Ok(Self(table))
    }

    /// Extracted entries are unique by construction
    pub fn from_entries(entries: &[ExternalAddressEntry]) -> Self {
        Self(
            entries
                .iter()
                .map(|e| (e.name.clone(), u64::from(e.address)))
                .collect(),
        )
    }

    pub fn get(&self, key: &str) -> Option<u64> {
        self.0.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl FromIterator<(String, u64)> for AddressTable {
    fn from_iter<T: IntoIterator<Item = (String, u64)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mismatch {
    /// Declared in the register map but not in the HDL source
    MissingInTarget { key: String, expected: u64 },
    /// Declared in the HDL source but not in the register map
    ExtraInTarget { key: String, actual: u64 },
    AddressMismatch {
        key: String,
        expected: u64,
        actual: u64,
    },
}

impl Mismatch {
    pub fn key(&self) -> &str {
        match self {
            Self::MissingInTarget { key, .. }
            | Self::ExtraInTarget { key, .. }
            | Self::AddressMismatch { key, .. } => key,
        }
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingInTarget { key, expected } => {
                write!(f, "missing in HDL: {key} (expected {})", Hex32(*expected))
            }
            Self::ExtraInTarget { key, actual } => {
                write!(f, "extra in HDL: {key} (has {})", Hex32(*actual))
            }
            Self::AddressMismatch {
                key,
                expected,
                actual,
            } => write!(
                f,
                "address mismatch {key}: expected {}, HDL has {}",
                Hex32(*expected),
                Hex32(*actual)
            ),
        }
    }
}

/// Outcome of comparing two address tables
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Number of keys present in both tables with equal addresses
    pub matched: usize,
    /// Missing keys first, then extra keys, then address mismatches; each group sorted by key
    pub mismatches: Vec<Mismatch>,
    /// Structural problems found while building the register map side. Registers skipped here
    /// are absent from the expected table.
    pub diagnostics: Diagnostics,
}

impl ReconcileReport {
    pub fn is_success(&self) -> bool {
        self.mismatches.is_empty() && !self.diagnostics.has_errors()
    }
}

/// Compare `expected` (register map side) against `actual` (HDL side) by exact key
pub fn reconcile(expected: &AddressTable, actual: &AddressTable) -> ReconcileReport {
    let mut missing = vec![];
    let mut extra = vec![];
    let mut differing = vec![];
    let mut matched = 0;

    for pair in expected
        .0
        .iter()
        .merge_join_by(actual.0.iter(), |(a, _), (b, _)| a.cmp(b))
    {
        match pair {
            EitherOrBoth::Left((key, &expected)) => missing.push(Mismatch::MissingInTarget {
                key: key.clone(),
                expected,
            }),
            EitherOrBoth::Right((key, &actual)) => extra.push(Mismatch::ExtraInTarget {
                key: key.clone(),
                actual,
            }),
            EitherOrBoth::Both((key, &expected), (_, &actual)) if expected != actual => {
                differing.push(Mismatch::AddressMismatch {
                    key: key.clone(),
                    expected,
                    actual,
                })
            }
            EitherOrBoth::Both(..) => matched += 1,
        }
    }

    let mismatches = missing
        .into_iter()
        .chain(extra)
        .chain(differing)
        .collect::<Vec<_>>();
    info!(
        "Reconciled {} keys: {matched} matched, {} mismatched.",
        expected.len().max(actual.len()),
        mismatches.len()
    );
    ReconcileReport {
        matched,
        mismatches,
        diagnostics: Diagnostics::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{frontend::load_regmap, model};

    fn table(entries: &[(&str, u64)]) -> AddressTable {
        entries.iter().map(|(k, v)| ((*k).to_owned(), *v)).collect()
    }

    fn regmap_table(text: &str) -> Result<AddressTable, ReconcileError> {
        let doc = load_regmap(text).unwrap();
        let map = model::build_register_map(&doc, &mut Default::default());
        AddressTable::from_registers(&map, "ADR_")
    }

    #[test]
    fn mismatched_address_is_the_only_finding() {
        let expected = regmap_table(
            r#"{ "blocks": [ { "name": "CORE", "base": 0, "registers": [
                { "name": "STATUS", "offset": "0x00", "access": "ro" },
                { "name": "CTRL", "offset": "0x04", "access": "rw" } ] } ] }"#,
        )
        .unwrap();
        let actual = table(&[("ADR_STATUS", 0x00), ("ADR_CTRL", 0x08)]);

        let report = reconcile(&expected, &actual);
        assert!(!report.is_success());
        assert_eq!(report.matched, 1);
        assert_eq!(
            report.mismatches,
            [Mismatch::AddressMismatch {
                key: "ADR_CTRL".to_owned(),
                expected: 0x04,
                actual: 0x08,
            }]
        );
        assert_eq!(
            report.mismatches[0].to_string(),
            "address mismatch ADR_CTRL: expected 0x00000004, HDL has 0x00000008"
        );
    }

    #[test]
    fn findings_are_grouped_then_sorted() {
        let expected = table(&[("ADR_B", 4), ("ADR_A", 0), ("ADR_D", 12), ("ADR_C", 8)]);
        let actual = table(&[("ADR_Z", 64), ("ADR_D", 16), ("ADR_C", 8), ("ADR_Y", 32)]);

        let report = reconcile(&expected, &actual);
        let keys: Vec<_> = report.mismatches.iter().map(Mismatch::key).collect();
        assert_eq!(keys, ["ADR_A", "ADR_B", "ADR_Y", "ADR_Z", "ADR_D"]);
        assert!(matches!(
            report.mismatches[0],
            Mismatch::MissingInTarget { expected: 0, .. }
        ));
        assert!(matches!(
            report.mismatches[2],
            Mismatch::ExtraInTarget { actual: 32, .. }
        ));
        assert_eq!(report.matched, 1);
    }

    #[test]
    fn identical_tables_reconcile() {
        let t = table(&[("ADR_ID", 0), ("ADR_CTRL", 0x100)]);
        let report = reconcile(&t, &t.clone());
        assert!(report.is_success());
        assert_eq!(report.matched, 2);
    }

    #[test]
    fn same_name_in_two_blocks_is_ambiguous() {
        let err = regmap_table(
            r#"{ "blocks": [
                { "name": "UART0", "base": 0, "registers": [
                    { "name": "DATA", "offset": 0, "access": "rw" } ] },
                { "name": "UART1", "base": 256, "registers": [
                    { "name": "DATA", "offset": 0, "access": "rw" } ] } ] }"#,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ReconcileError::AmbiguousName {
                key: "ADR_DATA".to_owned(),
                first: "UART0.DATA".to_owned(),
                second: "UART1.DATA".to_owned(),
            }
        );
    }
}
