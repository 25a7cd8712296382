//! Predicates used to check raw strings from an XDI header or data block.
//!
//! Every validator takes the raw text and returns `true` or `false`; none of them
//! panic or return errors. The token-shaped checks (words, identifiers, dates) run
//! against the same pest grammar as the formula matcher in [`crate::math_expr`].
//!
//! ```
//! use xdiformat::validators::{is_identifier, is_edge_name};
//! assert!(is_identifier("Mono_name"));
//! assert!(!is_identifier("Bogus!Name"));
//! assert!(is_edge_name("l3"));
//! ```
use pest::Parser;

#[derive(Parser)]
#[grammar = "xdi.pest"]
pub(crate) struct XdiParser;

/// Absorption edges an XDI file may declare in `Scan.edge`.
pub const EDGE_NAMES: &[&str] = &["K", "L3", "L2", "L1", "M4-5", "M3", "N", "O"];

fn matches(rule: Rule, s: &str) -> bool {
    XdiParser::parse(rule, s).is_ok()
}

/// `true` if `s` is one or more ASCII letters, digits, or underscores.
pub fn is_word(s: &str) -> bool {
    matches(Rule::word_only, s)
}

/// `true` if `s` starts with a letter or underscore, followed by letters, digits,
/// underscores, or hyphens. Field names and column labels must satisfy this.
pub fn is_identifier(s: &str) -> bool {
    matches(Rule::identifier_only, s)
}

/// `true` for timestamps like `2013-04-01T14:05:09` or `2013-4-1 14:5:9`.
pub fn is_datetime(s: &str) -> bool {
    matches(Rule::datetime_only, s)
}

/// `true` if `s` parses as a (signed) integer.
pub fn is_int(s: &str) -> bool {
    s.parse::<i64>().is_ok()
}

/// `true` if `s` is a finite floating point literal. Spellings of NaN and infinity
/// are rejected; use [`is_float_or_special`] to allow them.
pub fn is_float(s: &str) -> bool {
    s.parse::<f64>().map(|v| v.is_finite()).unwrap_or(false)
}

/// `true` if `s` is a floating point literal or one of `nan`/`inf` (any case, optionally signed).
pub fn is_float_or_special(s: &str) -> bool {
    s.parse::<f64>().is_ok()
}

/// `true` if `s` is a float optionally followed by a unit word, e.g. `"7.00 GeV"` or `"3.1356"`.
pub fn is_quantity(s: &str) -> bool {
    let mut tokens = s.split_whitespace();
    let number_ok = tokens.next().map(is_float).unwrap_or(false);
    let unit_ok = match (tokens.next(), tokens.next()) {
        (None, _) => true,
        (Some(unit), None) => is_printable(unit),
        (Some(_), Some(_)) => false,
    };
    number_ok && unit_ok
}

/// `true` if every character of `s` is printable ASCII or ASCII whitespace.
pub fn is_printable(s: &str) -> bool {
    s.chars().all(|c| c.is_ascii_graphic() || c.is_ascii_whitespace())
}

/// `true` if `s` is one of [`EDGE_NAMES`], compared case-insensitively.
pub fn is_edge_name(s: &str) -> bool {
    if !is_identifier(s) {
        return false;
    }
    let upper = s.to_ascii_uppercase();
    EDGE_NAMES.contains(&upper.as_str())
}
