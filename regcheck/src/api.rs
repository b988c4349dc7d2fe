//! Exposes functionality supported by this crate
mod error;

use std::path;

use log::info;

use crate::{analysis, codegen, frontend, model, util};

pub use crate::{
    analysis::{validate_document, ValidationReport},
    codegen::GenConfig,
    error::{ExtractError, Malformation, MalformedDocument, ReconcileError},
    frontend::{
        expand_includes, extract_addresses, extract_from_source, load_regmap, load_regmap_value,
        AddressPattern, BlockDecl, DocValue, ExpandedSource, ExternalAddressEntry, FieldDecl,
        RegisterDecl, SourceLocation, SpecDocument, DEFAULT_TAG,
    },
    model::{
        AddrRepr, BitRange, Block, Category, Declared, Diagnostic, Diagnostics, Field,
        FieldAccess, MakeAddrError, Register, RegisterAccess, RegisterMap, Severity,
    },
    reconcile::{reconcile, AddressTable, Mismatch, ReconcileReport},
};
pub use error::ApiError;

/// The only register map document version this crate understands
pub const SUPPORTED_VERSION: u64 = 1;

/// A register map document on disk
#[derive(Clone, Debug)]
pub struct ModelSource {
    path: path::PathBuf,
}

impl ModelSource {
    pub fn new(path: path::PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &path::Path {
        &self.path
    }

    fn load(&self) -> Result<SpecDocument, ApiError> {
        let text = util::read_file(&self.path)?;
        let doc = frontend::load_regmap(&text)?;
        info!(
            "Loaded {} blocks from {}.",
            doc.blocks.len(),
            self.path.display()
        );
        Ok(doc)
    }
}

/// Options for comparing against an HDL source
#[derive(Clone, Debug)]
pub struct CheckConfig {
    /// Prefix shared by the address constants in HDL, also prepended to register names on the
    /// register map side
    tag: String,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            tag: frontend::DEFAULT_TAG.to_owned(),
        }
    }
}

impl CheckConfig {
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn get_tag(&self) -> &str {
        &self.tag
    }
}

/// Load `source` and run every static check on it
///
/// # Errors
///
/// - The file cannot be read or is not a well-formed register map document
pub fn validate(source: &ModelSource) -> Result<ValidationReport, ApiError> {
    let doc = source.load()?;
    Ok(analysis::validate_document(&doc))
}

/// Compare the register addresses of `source` against the address constants in `hdl`
///
/// Runs independently of [`validate`]: validation errors in `source` do not prevent the
/// comparison. Registers the model builder had to skip are reported in
/// [`ReconcileReport::diagnostics`] and fail the check.
///
/// # Errors
///
/// - The register map cannot be loaded
/// - Include expansion or extraction from `hdl` fails
/// - Two registers in `source` map to the same constant name
pub fn check_hdl(
    source: &ModelSource,
    hdl: &path::Path,
    cfg: &CheckConfig,
) -> Result<ReconcileReport, ApiError> {
    let doc = source.load()?;
    let mut diags = Diagnostics::default();
    let map = model::build_register_map(&doc, &mut diags);
    let expected = AddressTable::from_registers(&map, &cfg.tag)?;

    let entries = frontend::extract_addresses(hdl, &cfg.tag)?;
    let actual = AddressTable::from_entries(&entries);

    Ok(ReconcileReport {
        diagnostics: diags,
        ..reconcile(&expected, &actual)
    })
}

/// Load and validate `source` for an emitter
fn validated_map(source: &ModelSource) -> Result<RegisterMap, ApiError> {
    let doc = source.load()?;
    if let Some(version) = doc.version.filter(|v| *v != SUPPORTED_VERSION) {
        return Err(ApiError::UnsupportedVersion(version));
    }
    let report = analysis::validate_document(&doc);
    let error_count = report.errors().count();
    if error_count != 0 {
        return Err(ApiError::InvalidRegisterMap(error_count));
    }
    Ok(report.register_map().clone())
}

/// Render `source` as a C header
///
/// # Errors
///
/// - The register map cannot be loaded, has an unsupported version, or fails validation
pub fn generate_c_header(source: &ModelSource, cfg: &GenConfig) -> Result<String, ApiError> {
    let map = validated_map(source)?;
    let text = codegen::emit_c_header(&map, cfg);
    info!("Wrote {} register definitions.", map.len());
    Ok(text)
}

/// Render `source` as a SystemVerilog package
///
/// # Errors
///
/// - The register map cannot be loaded, has an unsupported version, or fails validation
pub fn generate_sv_package(source: &ModelSource, cfg: &GenConfig) -> Result<String, ApiError> {
    let map = validated_map(source)?;
    let text = codegen::emit_sv_package(&map, cfg);
    info!("Wrote {} register definitions.", map.len());
    Ok(text)
}

#[cfg(test)]
mod tests {
    use std::{fs, path::Path};

    use indoc::indoc;

    use super::*;

    const MAP: &str = indoc! {r#"
        { "version": 1, "blocks": [ { "name": "CORE", "base": "0x0", "registers": [
            { "name": "STATUS", "offset": "0x00", "access": "ro", "desc": "Status" },
            { "name": "CTRL", "offset": "0x04", "access": "rw", "desc": "Control" } ] } ] }
    "#};

    fn source(dir: &Path, text: &str) -> ModelSource {
        let path = dir.join("regmap.json");
        fs::write(&path, text).unwrap();
        ModelSource::new(path)
    }

    #[test]
    fn check_hdl_reports_address_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let src = source(dir.path(), MAP);
        fs::write(
            dir.path().join("regs.vh"),
            "localparam [31:0] ADR_STATUS = 32'h0000_0000;\nlocalparam [31:0] ADR_CTRL = 32'h0000_0008;\n",
        )
        .unwrap();
        let top = dir.path().join("top.v");
        fs::write(&top, "module top;\n`include \"regs.vh\"\nendmodule\n").unwrap();

        let report = check_hdl(&src, &top, &CheckConfig::default()).unwrap();
        assert_eq!(
            report.mismatches,
            [Mismatch::AddressMismatch {
                key: "ADR_CTRL".to_owned(),
                expected: 4,
                actual: 8
            }]
        );
    }

    #[test]
    fn check_hdl_reports_unnamed_register() {
        let dir = tempfile::tempdir().unwrap();
        let src = source(
            dir.path(),
            r#"{ "blocks": [ { "name": "CORE", "base": 0, "registers": [
                { "offset": 0, "access": "ro" },
                { "name": "CTRL", "offset": 4, "access": "rw" } ] } ] }"#,
        );
        let hdl = dir.path().join("regs.vh");
        fs::write(&hdl, "localparam [31:0] ADR_CTRL = 32'h0000_0004;\n").unwrap();

        let report = check_hdl(&src, &hdl, &CheckConfig::default()).unwrap();
        assert!(report.mismatches.is_empty());
        assert_eq!(report.matched, 1);
        assert!(!report.is_success());
        let errors: Vec<_> = report.diagnostics.errors().map(ToString::to_string).collect();
        assert_eq!(
            errors,
            ["ERROR[structure]: Block CORE: register #0 missing name"]
        );
    }

    #[test]
    fn generators_refuse_unsupported_version() {
        let dir = tempfile::tempdir().unwrap();
        let src = source(dir.path(), &MAP.replace(r#""version": 1"#, r#""version": 2"#));
        let err = generate_c_header(&src, &GenConfig::new("regmap.json")).unwrap_err();
        assert!(matches!(err, ApiError::UnsupportedVersion(2)), "{err}");

        // Validation itself does not look at the version
        assert!(validate(&src).unwrap().is_success());
    }

    #[test]
    fn generators_refuse_invalid_map() {
        let dir = tempfile::tempdir().unwrap();
        let src = source(dir.path(), &MAP.replace(r#""0x04""#, r#""0x00""#));
        let err = generate_sv_package(&src, &GenConfig::new("regmap.json")).unwrap_err();
        assert!(matches!(err, ApiError::InvalidRegisterMap(1)), "{err}");
    }

    #[test]
    fn generators_accept_valid_map() {
        let dir = tempfile::tempdir().unwrap();
        let src = source(dir.path(), MAP);
        let cfg = GenConfig::new("regmap.json");
        assert!(generate_c_header(&src, &cfg)
            .unwrap()
            .contains("#define HOMEINV_REG_CTRL"));
        assert!(generate_sv_package(&src, &cfg)
            .unwrap()
            .contains("HOMEINV_ADR_STATUS = 32'h00000000;"));
    }

    #[test]
    fn missing_source_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = validate(&ModelSource::new(dir.path().join("nope.json"))).unwrap_err();
        assert!(matches!(err, ApiError::Io(_)), "{err}");
    }
}
