//! Address constants from HDL sources
//!
//! Only two line shapes are recognized: quote-form `` `include "path" `` directives and typed
//! `localparam` declarations binding a tagged name to a 32-bit hexadecimal literal, e.g.,
//! `localparam [31:0] ADR_CTRL = 32'h0000_0100;`.

use std::{
    collections::{hash_map::Entry, HashMap, HashSet},
    fmt,
    path::{Path, PathBuf},
    rc::Rc,
};

use lazy_static::lazy_static;
use log::{debug, info};
use regex::Regex;

use crate::{error::ExtractError, util};

/// Default tag of recognized address constants
pub const DEFAULT_TAG: &str = "ADR_";

/// Position of a line in an HDL source file, indexes start from 1
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceLocation {
    pub path: PathBuf,
    pub line: usize,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path.display(), self.line)
    }
}

#[derive(Clone, Debug)]
struct ExpandedLine {
    origin: Rc<Path>,
    line: usize,
    text: String,
}

impl ExpandedLine {
    fn location(&self) -> SourceLocation {
        SourceLocation {
            path: self.origin.to_path_buf(),
            line: self.line,
        }
    }
}

/// HDL text with every include directive replaced by the contents of the included file
#[derive(Clone, Debug)]
pub struct ExpandedSource {
    root: PathBuf,
    lines: Vec<ExpandedLine>,
}

impl ExpandedSource {
    /// Canonical path of the file the expansion started from
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The expanded text, one line per source line plus the include markers
    pub fn text(&self) -> String {
        let mut text = self
            .lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        text.push('\n');
        text
    }
}

/// Read `path` and recursively expand its include directives
///
/// Included paths are resolved relative to the directory of the including file. Each expansion
/// is wrapped in `// BEGIN_INCLUDE <path>` and `// END_INCLUDE <path>` lines.
///
/// # Errors
///
/// - A file on the current inclusion chain is included again
/// - A file cannot be read
pub fn expand_includes(path: &Path) -> Result<ExpandedSource, ExtractError> {
    let root = util::canonicalize(path)?;
    let mut lines = vec![];
    expand_into(&root, &HashSet::new(), &mut lines)?;
    Ok(ExpandedSource { root, lines })
}

/// # Arguments
///
/// * `path` - Canonical path of the file to expand
/// * `chain` - Files on the inclusion path leading to `path`, not including it
/// * `out` - Receives the expanded lines
fn expand_into(
    path: &Path,
    chain: &HashSet<PathBuf>,
    out: &mut Vec<ExpandedLine>,
) -> Result<(), ExtractError> {
    lazy_static! {
        static ref INCLUDE_RE: Regex = Regex::new(r#"^\s*`include\s+"([^"]+)"\s*$"#).unwrap();
    }

    if chain.contains(path) {
        return Err(ExtractError::IncludeCycle {
            path: path.to_path_buf(),
        });
    }
    let mut chain = chain.clone();
    chain.insert(path.to_path_buf());

    let text = util::read_file(path)?;
    let origin: Rc<Path> = Rc::from(path);
    let dir = path.parent().unwrap_or_else(|| Path::new(""));

    for (idx, line) in text.lines().enumerate() {
        let here = |text: String| ExpandedLine {
            origin: Rc::clone(&origin),
            line: idx + 1,
            text,
        };
        match INCLUDE_RE.captures(line) {
            Some(captures) => {
                let included = util::canonicalize(&dir.join(&captures[1]))?;
                debug!(
                    "expanding include of {} at {}:{}",
                    included.display(),
                    path.display(),
                    idx + 1
                );
                out.push(here(format!("// BEGIN_INCLUDE {}", included.display())));
                expand_into(&included, &chain, out)?;
                out.push(here(format!("// END_INCLUDE {}", included.display())));
            }
            None => out.push(here(line.to_owned())),
        }
    }
    Ok(())
}

/// A name-to-address pair declared in an HDL source
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExternalAddressEntry {
    /// Full constant name including the tag, e.g., `ADR_CTRL`
    pub name: String,
    pub address: u32,
    pub location: SourceLocation,
}

/// Recognizer for tagged address constant declarations
pub struct AddressPattern {
    tag: String,
    re: Regex,
}

impl AddressPattern {
    pub fn new(tag: &str) -> Result<Self, regex::Error> {
        let re = Regex::new(&format!(
            r"^\s*localparam\s+\[[^\]]+\]\s+({}[A-Z0-9_]+)\s*=\s*32'h([0-9A-Fa-f_]+)\s*;\s*$",
            regex::escape(tag)
        ))?;
        Ok(Self {
            tag: tag.to_owned(),
            re,
        })
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Returns the declared name and the raw hexadecimal literal on a match
    fn match_line<'l>(&self, line: &'l str) -> Option<(&'l str, &'l str)> {
        self.re.captures(line).and_then(|captures| {
            let name = captures.get(1)?.as_str();
            let literal = captures.get(2)?.as_str();
            Some((name, literal))
        })
    }
}

/// Extract every tagged address declaration from an expanded source, in source order
///
/// # Errors
///
/// - A name is declared twice
/// - A literal does not denote a 32-bit value
/// - No declaration was found
pub fn extract_from_source(
    source: &ExpandedSource,
    pattern: &AddressPattern,
) -> Result<Vec<ExternalAddressEntry>, ExtractError> {
    let mut entries = vec![];
    let mut seen: HashMap<&str, SourceLocation> = HashMap::new();

    for line in &source.lines {
        let Some((name, literal)) = pattern.match_line(&line.text) else {
            continue;
        };
        let location = line.location();
        let address = u64::from_str_radix(&literal.replace('_', ""), 16)
            .ok()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| ExtractError::InvalidLiteral {
                literal: literal.to_owned(),
                location: location.clone(),
            })?;
        match seen.entry(name) {
            Entry::Occupied(first) => {
                return Err(ExtractError::DuplicateDeclaration {
                    name: name.to_owned(),
                    first: first.get().clone(),
                    second: location,
                })
            }
            Entry::Vacant(entry) => {
                entry.insert(location.clone());
            }
        }
        entries.push(ExternalAddressEntry {
            name: name.to_owned(),
            address,
            location,
        });
    }

    if entries.is_empty() {
        return Err(ExtractError::NoDeclarationsFound {
            tag: pattern.tag().to_owned(),
            path: source.root().to_path_buf(),
        });
    }
    Ok(entries)
}

/// Read the HDL source at `path` and extract its address declarations tagged with `tag`
///
/// # Errors
///
/// - See [`expand_includes`] and [`extract_from_source`]
pub fn extract_addresses(
    path: &Path,
    tag: &str,
) -> Result<Vec<ExternalAddressEntry>, ExtractError> {
    let pattern = AddressPattern::new(tag)?;
    let source = expand_includes(path)?;
    let entries = extract_from_source(&source, &pattern)?;
    info!(
        "Found {} {}* declarations in {}.",
        entries.len(),
        tag,
        source.root().display()
    );
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn recognizes_declaration_shape() {
        let pattern = AddressPattern::new(DEFAULT_TAG).unwrap();
        assert_eq!(
            pattern.match_line("  localparam [31:0] ADR_CTRL = 32'h0000_0100;"),
            Some(("ADR_CTRL", "0000_0100"))
        );
        assert_eq!(
            pattern.match_line("localparam [31:0] ADR_IRQ_EN=32'h104 ;  "),
            Some(("ADR_IRQ_EN", "104"))
        );
        // Not a typed declaration, wrong tag, not hexadecimal, trailing code
        assert_eq!(pattern.match_line("localparam ADR_CTRL = 32'h0;"), None);
        assert_eq!(pattern.match_line("localparam [31:0] REG_CTRL = 32'h0;"), None);
        assert_eq!(pattern.match_line("localparam [31:0] ADR_CTRL = 32'd4;"), None);
        assert_eq!(
            pattern.match_line("localparam [31:0] ADR_CTRL = 32'h0; // ok"),
            None
        );
    }

    #[test]
    fn expands_nested_includes_with_markers() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "inc/regs.vh",
            "localparam [31:0] ADR_CTRL = 32'h0000_0004;\n`include \"more.vh\"\n",
        );
        write(
            dir.path(),
            "inc/more.vh",
            "localparam [31:0] ADR_STATUS = 32'h0000_0008;\n",
        );
        let top = write(
            dir.path(),
            "top.v",
            "module top;\n  `include \"inc/regs.vh\"\n  localparam [31:0] ADR_ID = 32'h0;\nendmodule\n",
        );

        let source = expand_includes(&top).unwrap();
        let text = source.text();
        let regs = util::canonicalize(&dir.path().join("inc/regs.vh")).unwrap();
        assert!(text.contains(&format!("// BEGIN_INCLUDE {}\n", regs.display())));
        assert!(text.contains(&format!("// END_INCLUDE {}\n", regs.display())));
        assert!(!text.contains("`include"));

        let entries = extract_addresses(&top, DEFAULT_TAG).unwrap();
        let names: Vec<_> = entries.iter().map(|e| (e.name.as_str(), e.address)).collect();
        assert_eq!(
            names,
            [("ADR_CTRL", 0x4), ("ADR_STATUS", 0x8), ("ADR_ID", 0x0)]
        );
        assert_eq!(entries[1].location.line, 1);
        assert!(entries[1].location.path.ends_with("more.vh"));
    }

    #[test]
    fn sibling_includes_of_the_same_file_are_not_a_cycle() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "common.vh", "// shared\n");
        write(dir.path(), "a.vh", "`include \"common.vh\"\n");
        write(
            dir.path(),
            "b.vh",
            "`include \"common.vh\"\nlocalparam [31:0] ADR_X = 32'h10;\n",
        );
        let top = write(dir.path(), "top.v", "`include \"a.vh\"\n`include \"b.vh\"\n");

        let entries = extract_addresses(&top, DEFAULT_TAG).unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn include_cycle_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(
            dir.path(),
            "a.v",
            "localparam [31:0] ADR_A = 32'h0;\n`include \"b.v\"\n",
        );
        let b = write(dir.path(), "b.v", "`include \"a.v\"\n");

        let err = extract_addresses(&a, DEFAULT_TAG).unwrap_err();
        let path = match err {
            ExtractError::IncludeCycle { path } => path,
            other => panic!("expected include cycle, got {other:?}"),
        };
        let a = util::canonicalize(&a).unwrap();
        let b = util::canonicalize(&b).unwrap();
        assert!(path == a || path == b);
    }

    #[test]
    fn self_include_is_a_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.v", "`include \"a.v\"\n");
        assert!(matches!(
            expand_includes(&a),
            Err(ExtractError::IncludeCycle { .. })
        ));
    }

    #[test]
    fn missing_include_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.v", "`include \"nope.vh\"\n");
        assert!(matches!(expand_includes(&a), Err(ExtractError::Io(_))));
    }

    #[test]
    fn duplicate_declaration_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "regs.vh", "localparam [31:0] ADR_CTRL = 32'h4;\n");
        let top = write(
            dir.path(),
            "top.v",
            "`include \"regs.vh\"\nlocalparam [31:0] ADR_CTRL = 32'h4;\n",
        );

        let err = extract_addresses(&top, DEFAULT_TAG).unwrap_err();
        let (name, first, second) = match err {
            ExtractError::DuplicateDeclaration {
                name,
                first,
                second,
            } => (name, first, second),
            other => panic!("expected duplicate declaration, got {other:?}"),
        };
        assert_eq!(name, "ADR_CTRL");
        assert!(first.path.ends_with("regs.vh"));
        assert!(second.path.ends_with("top.v"));
        assert_eq!(second.line, 2);
    }

    #[test]
    fn empty_result_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let top = write(
            dir.path(),
            "top.v",
            "module top;\n  localparam [31:0] REG_CTRL = 32'h4;\nendmodule\n",
        );
        assert!(matches!(
            extract_addresses(&top, DEFAULT_TAG),
            Err(ExtractError::NoDeclarationsFound { .. })
        ));
        // The same file does declare constants under another tag
        assert_eq!(extract_addresses(&top, "REG_").unwrap().len(), 1);
    }

    #[test]
    fn oversized_literal_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let top = write(
            dir.path(),
            "top.v",
            "localparam [31:0] ADR_CTRL = 32'h1_0000_0000;\n",
        );
        assert!(matches!(
            extract_addresses(&top, DEFAULT_TAG),
            Err(ExtractError::InvalidLiteral { .. })
        ));
    }
}
