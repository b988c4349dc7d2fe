//! Classified findings collected while building and validating a register map

use std::fmt;

use strum::Display;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Severity {
    /// Blocks success
    Error,
    /// Reported but never fatal
    Warning,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Category {
    /// A register or field entry is malformed and was skipped
    Structure,
    Alignment,
    AddressRange,
    AddressCollision,
    BitRange,
    FieldOverlap,
    Access,
    Reset,
    Naming,
    Documentation,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub category: Category,
    /// Fully-qualified name of the offending entity, e.g., `CORE.CTRL.ENABLE`
    pub entity: String,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: {}", self.severity, self.category, self.message)
    }
}

/// Accumulator for diagnostics, threaded through each validation step
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub(crate) fn error(
        &mut self,
        category: Category,
        entity: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.push(Severity::Error, category, entity.into(), message.into());
    }

    pub(crate) fn warning(
        &mut self,
        category: Category,
        entity: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.push(Severity::Warning, category, entity.into(), message.into());
    }

    fn push(&mut self, severity: Severity, category: Category, entity: String, message: String) {
        self.0.push(Diagnostic {
            severity,
            category,
            entity,
            message,
        });
    }

    /// All diagnostics in the order they were recorded
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.iter().filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.iter().filter(|d| d.severity == Severity::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    /// Number of diagnostics of `category`, regardless of severity
    pub fn count(&self, category: Category) -> usize {
        self.iter().filter(|d| d.category == category).count()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[test]
fn diagnostics_partition_by_severity() {
    let mut diags = Diagnostics::default();
    diags.warning(Category::Documentation, "CORE.ID", "CORE.ID: missing description");
    assert!(!diags.has_errors());

    diags.error(Category::FieldOverlap, "CORE.CTRL", "CORE.CTRL: field overlap at B (1:0)");
    assert!(diags.has_errors());
    assert_eq!(diags.errors().count(), 1);
    assert_eq!(diags.warnings().count(), 1);
    assert_eq!(diags.count(Category::FieldOverlap), 1);
    assert_eq!(
        diags.errors().next().unwrap().to_string(),
        "ERROR[field-overlap]: CORE.CTRL: field overlap at B (1:0)"
    );
    assert_eq!(
        diags.warnings().next().unwrap().to_string(),
        "WARNING[documentation]: CORE.ID: missing description"
    );
}
