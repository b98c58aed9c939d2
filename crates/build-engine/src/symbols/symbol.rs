//! Resource symbols
//!
//! In-memory form of the entries of an `R.txt` symbol file:
//!
//! ```text
//! int id icon 0x7f010001
//! int[] styleable MyView { 0x7f020000, 0x7f020001 }
//! int styleable MyView_color 0
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use once_cell::sync::Lazy;
use regex::Regex;

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("identifier pattern"));

static LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:0[xX][0-9a-fA-F]+|-?[0-9]+)$").expect("literal pattern"));

/// Symbol kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    /// `int`
    Int,
    /// `int[]`, the index arrays of styleables
    IntArray,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Int => "int",
            SymbolKind::IntArray => "int[]",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "int" => Some(SymbolKind::Int),
            "int[]" => Some(SymbolKind::IntArray),
            _ => None,
        }
    }
}

/// Why a symbol line was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SymbolLineError {
    #[error("expected '<kind> <type> <name> <value>'")]
    MissingTokens,
    #[error("unknown symbol kind '{0}'")]
    UnknownKind(String),
    #[error("invalid identifier '{0}'")]
    InvalidIdentifier(String),
    #[error("invalid value '{0}'")]
    InvalidValue(String),
}

/// One resource symbol
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Symbol {
    pub kind: SymbolKind,
    /// Resource type (id, string, layout, attr, styleable, ...)
    pub resource_type: String,
    pub name: String,
    /// Scalar literal, or `{ a, b }` for arrays
    pub value: String,
}

impl Symbol {
    /// Parse one symbol line
    pub fn parse_line(line: &str) -> Result<Self, SymbolLineError> {
        let (kind_token, rest) = next_token(line).ok_or(SymbolLineError::MissingTokens)?;
        let (resource_type, rest) = next_token(rest).ok_or(SymbolLineError::MissingTokens)?;
        let (name, rest) = next_token(rest).ok_or(SymbolLineError::MissingTokens)?;
        let raw_value = rest.trim();
        if raw_value.is_empty() {
            return Err(SymbolLineError::MissingTokens);
        }

        let kind = SymbolKind::parse(kind_token)
            .ok_or_else(|| SymbolLineError::UnknownKind(kind_token.to_string()))?;

        for ident in [resource_type, name] {
            if !IDENTIFIER.is_match(ident) {
                return Err(SymbolLineError::InvalidIdentifier(ident.to_string()));
            }
        }

        let value = match kind {
            SymbolKind::Int => {
                if !LITERAL.is_match(raw_value) {
                    return Err(SymbolLineError::InvalidValue(raw_value.to_string()));
                }
                raw_value.to_string()
            }
            SymbolKind::IntArray => normalize_array(raw_value)?,
        };

        Ok(Self {
            kind,
            resource_type: resource_type.to_string(),
            name: name.to_string(),
            value,
        })
    }

    /// Table key: `(resource type, name)`
    pub fn key(&self) -> (&str, &str) {
        (&self.resource_type, &self.name)
    }

    /// Elements of an array value (empty for scalars)
    #[cfg(test)]
    pub(crate) fn array_elements(&self) -> Vec<&str> {
        match self.kind {
            SymbolKind::Int => Vec::new(),
            SymbolKind::IntArray => self
                .value
                .trim_start_matches('{')
                .trim_end_matches('}')
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    /// Field declaration for generated sources
    pub fn java_field(&self) -> String {
        format!("public static final {} {}={};", self.kind.as_str(), self.name, self.value)
    }
}

impl fmt::Display for Symbol {
    /// Renders the `R.txt` line
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", self.kind.as_str(), self.resource_type, self.name, self.value)
    }
}

fn next_token(input: &str) -> Option<(&str, &str)> {
    let input = input.trim_start();
    if input.is_empty() {
        return None;
    }
    match input.find(char::is_whitespace) {
        Some(end) => Some((&input[..end], &input[end..])),
        None => Some((input, "")),
    }
}

/// Accepts `{ a, b }` (aapt) and the brace-less `a,b`; renders `{ a, b }`
fn normalize_array(raw: &str) -> Result<String, SymbolLineError> {
    let inner = match (raw.strip_prefix('{'), raw.ends_with('}')) {
        (Some(open), true) => open.strip_suffix('}').unwrap_or(open),
        (None, false) => raw,
        _ => return Err(SymbolLineError::InvalidValue(raw.to_string())),
    };

    let mut elements = Vec::new();
    if !inner.trim().is_empty() {
        for element in inner.split(',') {
            let element = element.trim();
            if !LITERAL.is_match(element) {
                return Err(SymbolLineError::InvalidValue(raw.to_string()));
            }
            elements.push(element);
        }
    }

    if elements.is_empty() {
        Ok("{ }".to_string())
    } else {
        Ok(format!("{{ {} }}", elements.join(", ")))
    }
}

/// Ordered symbols of one symbol file
///
/// Order follows the file. `(resource type, name)` is unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    path: PathBuf,
    symbols: Vec<Symbol>,
    /// resource type -> name -> position in `symbols`
    index: HashMap<String, HashMap<String, usize>>,
}

impl SymbolTable {
    /// Create an empty table for the file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            symbols: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Source file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `symbol`; returns false (and keeps the existing one) on a duplicate key
    pub fn insert(&mut self, symbol: Symbol) -> bool {
        let names = self.index.entry(symbol.resource_type.clone()).or_default();
        if names.contains_key(&symbol.name) {
            return false;
        }
        names.insert(symbol.name.clone(), self.symbols.len());
        self.symbols.push(symbol);
        true
    }

    /// Look up a symbol
    pub fn get(&self, resource_type: &str, name: &str) -> Option<&Symbol> {
        self.index
            .get(resource_type)
            .and_then(|names| names.get(name))
            .map(|&i| &self.symbols[i])
    }

    /// Symbols in file order
    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}
