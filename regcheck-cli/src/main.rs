use std::{env, fs, path, process::ExitCode};

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use log::debug;

#[derive(Parser)]
#[command(version, about, long_about = None, author = clap::crate_authors!(), subcommand_required = true)]
struct Cli {
    #[command(flatten)]
    verbose: Verbosity<WarnLevel>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run every static check on a register map
    Validate {
        /// Register map document (JSON)
        regmap: String,
    },
    /// Compare register addresses against the address constants of an HDL source
    ///
    /// Quote-style includes in the HDL source are expanded before reading the constants.
    #[command(name = "check-hdl")]
    CheckHdl {
        /// Register map document (JSON)
        regmap: String,
        /// Top-level HDL source file
        hdl: String,
        /// Prefix of the address constants, also prepended to register names
        #[arg(long, default_value = regcheck::DEFAULT_TAG)]
        tag: String,
    },
    /// Generate a C header with register addresses and field masks
    #[command(name = "gen-header")]
    GenHeader {
        /// Register map document (JSON)
        regmap: String,
        /// Write to this file instead of standard output
        #[arg(short, long)]
        out: Option<path::PathBuf>,
        #[arg(long, default_value = regcheck::GenConfig::DEFAULT_PREFIX)]
        prefix: String,
        /// File name written into the banner
        #[arg(long, default_value = regcheck::GenConfig::DEFAULT_HEADER_NAME)]
        header_name: String,
    },
    /// Generate a SystemVerilog package with register addresses and field masks
    #[command(name = "gen-sv-pkg")]
    GenSvPkg {
        /// Register map document (JSON)
        regmap: String,
        /// Write to this file instead of standard output
        #[arg(short, long)]
        out: Option<path::PathBuf>,
        #[arg(long, default_value = regcheck::GenConfig::DEFAULT_PREFIX)]
        prefix: String,
        #[arg(long, default_value = regcheck::GenConfig::DEFAULT_PACKAGE_NAME)]
        package: String,
    },
}

fn string_to_path(s: &str) -> anyhow::Result<path::PathBuf> {
    env::current_dir()
        .context("cannot access current working dir")?
        .join(s)
        // Canonicalize paths for clear output
        .canonicalize()
        .with_context(|| format!("cannot resolve path {s}"))
}

fn get_source(regmap: &str) -> anyhow::Result<regcheck::ModelSource> {
    let source = regcheck::ModelSource::new(string_to_path(regmap)?);
    if !source.path().is_file() {
        return Err(anyhow!("file does not exist: {}", source.path().display()));
    }
    Ok(source)
}

/// Label written into generated banners, as given on the command line
fn source_label(regmap: &str) -> String {
    path::Path::new(regmap)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.verbose.log_level_filter())
        .init();

    let outcome = run(&cli.command);
    if let Err(e) = &outcome {
        eprintln!("regcheck: {e:#}");
    }
    ExitCode::from(exit_status(&outcome))
}

/// 0 when every check passed, 1 on findings, 2 when the run could not complete
fn exit_status(outcome: &anyhow::Result<bool>) -> u8 {
    match outcome {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(_) => 2,
    }
}

/// Returns whether the checks passed
fn run(cmd: &Command) -> anyhow::Result<bool> {
    match cmd {
        Command::Validate { regmap } => validate(regmap),
        Command::CheckHdl { regmap, hdl, tag } => check_hdl(regmap, hdl, tag),
        Command::GenHeader {
            regmap,
            out,
            prefix,
            header_name,
        } => {
            let cfg = regcheck::GenConfig::new(source_label(regmap))
                .prefix(prefix)
                .header_name(header_name);
            let source = get_source(regmap)?;
            let output = regcheck::generate_c_header(&source, &cfg)
                .with_context(|| format!("cannot generate C header from {regmap}"))?;
            emit(&output, out.as_deref())?;
            Ok(true)
        }
        Command::GenSvPkg {
            regmap,
            out,
            prefix,
            package,
        } => {
            let cfg = regcheck::GenConfig::new(source_label(regmap))
                .prefix(prefix)
                .package_name(package);
            let source = get_source(regmap)?;
            let output = regcheck::generate_sv_package(&source, &cfg)
                .with_context(|| format!("cannot generate SystemVerilog package from {regmap}"))?;
            emit(&output, out.as_deref())?;
            Ok(true)
        }
    }
}

fn validate(regmap: &str) -> anyhow::Result<bool> {
    let source = get_source(regmap)?;
    let report =
        regcheck::validate(&source).with_context(|| format!("cannot load register map {regmap}"))?;

    for diag in report.diagnostics().iter() {
        eprintln!("{diag}");
    }
    let registers = report.register_map().len();
    let errors = report.errors().count();
    let warnings = report.warnings().count();
    if report.is_success() {
        println!("OK: {regmap} ({registers} registers, {warnings} warnings)");
    } else {
        eprintln!("FAILED: {regmap} ({registers} registers, {errors} errors, {warnings} warnings)");
    }
    Ok(report.is_success())
}

fn check_hdl(regmap: &str, hdl: &str, tag: &str) -> anyhow::Result<bool> {
    let source = get_source(regmap)?;
    let hdl_path = string_to_path(hdl)?;
    let cfg = regcheck::CheckConfig::default().tag(tag);
    let report = regcheck::check_hdl(&source, &hdl_path, &cfg)
        .with_context(|| format!("cannot compare {regmap} against {hdl}"))?;

    for diag in report.diagnostics.iter() {
        eprintln!("{diag}");
    }
    for mismatch in &report.mismatches {
        eprintln!("ERROR[mismatch]: {mismatch}");
    }
    if report.is_success() {
        println!(
            "OK: {} regs match between {regmap} and {hdl}",
            report.matched
        );
    } else {
        eprintln!(
            "FAILED: {} mismatches, {} errors between {regmap} and {hdl} ({} matched)",
            report.mismatches.len(),
            report.diagnostics.errors().count(),
            report.matched
        );
    }
    Ok(report.is_success())
}

/// Write generated text to `out`, or standard output if not given
fn emit(text: &str, out: Option<&path::Path>) -> anyhow::Result<()> {
    let Some(out) = out else {
        print!("{text}");
        return Ok(());
    };
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("cannot create directory {}", parent.display()))?;
    }
    fs::write(out, text).with_context(|| format!("cannot write {}", out.display()))?;
    debug!("wrote {}", out.display());
    Ok(())
}
