//! KiCad Legacy Line Records (Versions 4-5)
//!
//! Archiving only needs a handful of fields from the KiCad 5 text formats,
//! and every one of them fits on a single line. Each record below parses one
//! line (without its terminator) and can render itself back with a single
//! field replaced, so the rest of the line survives byte for byte.
//!
//! Records and their capture groups:
//!
//! | Record            | File                | Shape                                          |
//! |-------------------|---------------------|------------------------------------------------|
//! | `LibTableEntry`   | `fp-lib-table`      | `(lib (name N)(type T)(uri U)(options ...)...` |
//! | `FootprintField`  | `.sch`              | `F 2 "LIB:FOOTPRINT" <rest>`                   |
//! | `FootprintField`  | `.lib`              | `F2 "LIB:FOOTPRINT" <rest>`                    |
//! | `ModelField`      | `.kicad_mod`        | `(model PATH<rest>`                            |
//! | `SymbolRef`       | `.sch`              | `L LIB:SYMBOL <reference>`                     |
//!
//! `LIB` is matched greedily up to the last `:` of the field.

use std::sync::LazyLock;

use regex::Regex;

static LIB_TABLE_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\(lib\s+\(name\s+(.*)\)\s*\(type.*\)\s*\(uri\s+(.*)\)\s*\(options.*$").unwrap()
});

static SCHEMATIC_FOOTPRINT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^(F\s2\s")(.*):(.*)("\s.*)$"#).unwrap());

static SYMBOL_LIB_FOOTPRINT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^(F2\s")(.*):(.*)("\s.*)$"#).unwrap());

static MODEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^(\s*\(model\s+)("[^"]*"|[^\s)]+)(.*)$"#).unwrap());

static SYMBOL_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(L\s)(.*):(.*)$").unwrap());

fn unquote(s: &str) -> &str {
    let s = s.trim();
    s.strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(s)
}

// ============================================================================
// Library table
// ============================================================================

/// One `(lib ...)` row of a library table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibTableEntry<'a> {
    pub name: &'a str,
    /// Raw URI, placeholders not yet expanded.
    pub uri: &'a str,
}

impl<'a> LibTableEntry<'a> {
    pub fn parse(line: &'a str) -> Option<Self> {
        let caps = LIB_TABLE_ENTRY.captures(line)?;
        Some(Self {
            name: unquote(caps.get(1)?.as_str()),
            uri: unquote(caps.get(2)?.as_str()),
        })
    }
}

// ============================================================================
// Footprint assignment fields
// ============================================================================

/// Footprint assignment `"LIB:FOOTPRINT"` on a schematic or symbol line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FootprintField<'a> {
    prefix: &'a str,
    pub library: &'a str,
    pub footprint: &'a str,
    suffix: &'a str,
}

impl<'a> FootprintField<'a> {
    /// Field 2 of a schematic component: `F 2 "LIB:FP" ...`.
    pub fn parse_schematic(line: &'a str) -> Option<Self> {
        Self::parse_with(&SCHEMATIC_FOOTPRINT, line)
    }

    /// Field 2 of a symbol definition in a `.lib` file: `F2 "LIB:FP" ...`.
    pub fn parse_symbol_library(line: &'a str) -> Option<Self> {
        Self::parse_with(&SYMBOL_LIB_FOOTPRINT, line)
    }

    fn parse_with(re: &Regex, line: &'a str) -> Option<Self> {
        let caps = re.captures(line)?;
        Some(Self {
            prefix: caps.get(1)?.as_str(),
            library: caps.get(2)?.as_str(),
            footprint: caps.get(3)?.as_str(),
            suffix: caps.get(4)?.as_str(),
        })
    }

    /// The same line with the library nickname replaced.
    pub fn with_library(&self, library: &str) -> String {
        format!("{}{}:{}{}", self.prefix, library, self.footprint, self.suffix)
    }
}

// ============================================================================
// 3D model field
// ============================================================================

/// `(model PATH` line of a footprint.
///
/// KiCad 5 writes the model block over several lines, with only the path on
/// the opening line; a one-line `(model PATH)` is accepted as well. The
/// closing parenthesis and anything else after the path stay in `rest`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelField<'a> {
    prefix: &'a str,
    raw_path: &'a str,
    rest: &'a str,
}

impl<'a> ModelField<'a> {
    pub fn parse(line: &'a str) -> Option<Self> {
        let caps = MODEL.captures(line)?;
        Some(Self {
            prefix: caps.get(1)?.as_str(),
            raw_path: caps.get(2)?.as_str(),
            rest: caps.get(3)?.as_str(),
        })
    }

    /// Model path with surrounding quotes removed.
    pub fn path(&self) -> &'a str {
        unquote(self.raw_path)
    }

    fn is_quoted(&self) -> bool {
        self.raw_path.starts_with('"')
    }

    /// Last `/`-separated segment of the path, if the path has a directory.
    pub fn file_name(&self) -> Option<&'a str> {
        let (_, name) = self.path().rsplit_once('/')?;
        (!name.is_empty()).then_some(name)
    }

    /// The same line with the path replaced, keeping its quoting.
    pub fn with_path(&self, path: &str) -> String {
        if self.is_quoted() {
            format!("{}\"{}\"{}", self.prefix, path, self.rest)
        } else {
            format!("{}{}{}", self.prefix, path, self.rest)
        }
    }
}

// ============================================================================
// Symbol reference
// ============================================================================

/// Component symbol line `L LIB:SYMBOL REF` in a schematic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolRef<'a> {
    prefix: &'a str,
    pub library: &'a str,
    /// Symbol name followed by the rest of the line (the reference).
    pub symbol: &'a str,
}

impl<'a> SymbolRef<'a> {
    pub fn parse(line: &'a str) -> Option<Self> {
        let caps = SYMBOL_REF.captures(line)?;
        Some(Self {
            prefix: caps.get(1)?.as_str(),
            library: caps.get(2)?.as_str(),
            symbol: caps.get(3)?.as_str(),
        })
    }

    /// Move the symbol into `library`, keeping the old library name as a
    /// `OLDLIB_` prefix so symbols from different libraries cannot clash.
    pub fn relocated_to(&self, library: &str) -> String {
        format!("{}{}:{}_{}", self.prefix, library, self.library, self.symbol)
    }
}
