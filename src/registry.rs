//! The table of recognized XDI header fields and the rules for classifying field names.
//!
//! XDI header fields are named `Family.member` (e.g. `Mono.dspacing`). Names are
//! compared in canonical form: lower case with `-` replaced by `_`. Recognized
//! fields are bound to a [`FieldType`] that decides how their value is validated.
//! Names outside the table are still accepted if they are well-formed identifiers;
//! names like `APP_field` whose prefix is not a recognized family are routed to a
//! per-application side table instead of the main attributes.
use std::fmt::Display;
use std::str::FromStr;

use crate::math_expr::MathExpr;
use crate::validators::{
    is_datetime, is_edge_name, is_identifier, is_int, is_printable, is_quantity, is_word,
};

/// The kind of value a registered field holds, which selects its validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Any non-empty printable text
    Text,
    /// A single word, e.g. an element symbol
    Word,
    /// A number with an optional unit, e.g. `7.00 GeV`
    Quantity,
    Integer,
    DateTime,
    /// An absorption edge name
    Edge,
    /// A column formula, e.g. `-ln($3/$2)`
    Formula,
}

impl FieldType {
    pub fn validate(&self, value: &str) -> bool {
        match self {
            FieldType::Text => !value.is_empty() && is_printable(value),
            FieldType::Word => is_word(value),
            FieldType::Quantity => is_quantity(value),
            FieldType::Integer => is_int(value),
            FieldType::DateTime => is_datetime(value),
            FieldType::Edge => is_edge_name(value),
            FieldType::Formula => MathExpr::parse(value).is_some(),
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            FieldType::Text => "non-empty printable text",
            FieldType::Word => "a single word",
            FieldType::Quantity => "a number with an optional unit",
            FieldType::Integer => "an integer",
            FieldType::DateTime => "a date and time (YYYY-MM-DD HH:MM:SS)",
            FieldType::Edge => "an absorption edge name",
            FieldType::Formula => "a column formula such as -ln($3/$2)",
        }
    }
}

/// Recognized `family.member` fields. A `None` member marks a single-level field.
const REGISTRY: &[(&str, Option<&str>, FieldType)] = &[
    ("facility", Some("name"), FieldType::Text),
    ("facility", Some("energy"), FieldType::Quantity),
    ("facility", Some("current"), FieldType::Quantity),
    ("facility", Some("xray_source"), FieldType::Text),
    ("facility", Some("critical_energy"), FieldType::Quantity),
    ("beamline", Some("name"), FieldType::Text),
    ("beamline", Some("focusing"), FieldType::Text),
    ("beamline", Some("collimation"), FieldType::Text),
    ("beamline", Some("harmonic_rejection"), FieldType::Text),
    ("mono", Some("name"), FieldType::Text),
    ("mono", Some("dspacing"), FieldType::Quantity),
    ("mono", Some("cooling"), FieldType::Text),
    ("scan", Some("mode"), FieldType::Text),
    ("scan", Some("element"), FieldType::Word),
    ("scan", Some("edge"), FieldType::Edge),
    ("scan", Some("start_time"), FieldType::DateTime),
    ("scan", Some("stop_time"), FieldType::DateTime),
    ("scan", Some("n_regions"), FieldType::Integer),
    ("detectors", Some("i0"), FieldType::Text),
    ("detectors", Some("itrans"), FieldType::Text),
    ("detectors", Some("ifluor"), FieldType::Text),
    ("detectors", Some("irefer"), FieldType::Text),
    ("sample", Some("name"), FieldType::Text),
    ("sample", Some("formula"), FieldType::Text),
    ("sample", Some("preparation"), FieldType::Text),
    ("sample", Some("reference"), FieldType::Text),
    ("abscissa", None, FieldType::Formula),
    ("mu_transmission", None, FieldType::Formula),
    ("mu_fluorescence", None, FieldType::Formula),
    ("mu_reference", None, FieldType::Formula),
];

/// Look up the registered type of a field, if it is in the table.
pub fn lookup(family: &str, member: Option<&str>) -> Option<FieldType> {
    REGISTRY
        .iter()
        .find(|(f, m, _)| *f == family && *m == member)
        .map(|(_, _, t)| *t)
}

/// `true` if `name` is one of the recognized two-level families (e.g. `mono`).
pub fn is_family(name: &str) -> bool {
    REGISTRY.iter().any(|(f, m, _)| *f == name && m.is_some())
}

/// Lower-case a raw field name and replace `-` with `_`.
pub fn canonical_name(raw: &str) -> String {
    raw.trim().to_ascii_lowercase().replace('-', "_")
}

/// Key of an entry in a document's attributes.
///
/// Two-level fields have both a family and a member (`mono.name`); single-level
/// fields such as `abscissa` have only a family. Keys are stored in canonical
/// (lower case) form and order by family, then member.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AttrKey {
    family: String,
    member: Option<String>,
}

impl AttrKey {
    pub fn new(family: &str, member: &str) -> Self {
        Self { family: canonical_name(family), member: Some(canonical_name(member)) }
    }

    pub fn single(name: &str) -> Self {
        Self { family: canonical_name(name), member: None }
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn member(&self) -> Option<&str> {
        self.member.as_deref()
    }

    /// Build a key from its dotted form, e.g. `"Mono.name"` or `"abscissa"`.
    pub fn from_dotted(s: &str) -> Self {
        match s.split_once('.') {
            Some((family, member)) => Self::new(family, member),
            None => Self::single(s),
        }
    }

    /// The registered type of this field, if it is in the table.
    pub fn field_type(&self) -> Option<FieldType> {
        lookup(&self.family, self.member())
    }

    /// The name as written in a file header, with the family capitalized (`Mono.name`).
    pub fn header_name(&self) -> String {
        let family = capitalize(&self.family);
        match &self.member {
            Some(m) => format!("{family}.{m}"),
            None => family,
        }
    }
}

impl Display for AttrKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.member {
            Some(m) => write!(f, "{}.{m}", self.family),
            None => write!(f, "{}", self.family),
        }
    }
}

impl FromStr for AttrKey {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_dotted(s))
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for AttrKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for AttrKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from_dotted(&s))
    }
}

pub(crate) fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// Where a header field's value should be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldTarget {
    /// A key in the document's main attributes
    Attribute(AttrKey),
    /// A field belonging to an application namespace (`APP_field`)
    Extension { app: String, field: String },
}

/// Decide where the (already canonical) field `name` belongs and check that `value` is
/// acceptable for it.
///
/// Returns a human readable reason on failure. `column_*` names are not handled here.
pub fn classify(name: &str, value: &str) -> Result<FieldTarget, String> {
    let target = classify_name(name)?;

    let field_type = match &target {
        FieldTarget::Attribute(key) => key.field_type(),
        FieldTarget::Extension { .. } => None,
    };

    let valid = match field_type {
        Some(t) => t.validate(value),
        None => is_printable(value),
    };
    if !valid {
        let expected = field_type.map(|t| t.describe()).unwrap_or("printable text");
        return Err(format!("value '{value}' for field '{name}' is not {expected}"));
    }

    Ok(target)
}

fn classify_name(name: &str) -> Result<FieldTarget, String> {
    if name.is_empty() {
        return Err("field name is empty".to_owned());
    }

    if let Some((family, member)) = name.split_once('.') {
        if !is_identifier(family) || !is_identifier(member) {
            return Err(format!("'{name}' is not a valid Family.member field name"));
        }
        return Ok(FieldTarget::Attribute(AttrKey::new(family, member)));
    }

    if !is_identifier(name) {
        return Err(format!("'{name}' is not a valid field name"));
    }

    if lookup(name, None).is_some() {
        return Ok(FieldTarget::Attribute(AttrKey::single(name)));
    }

    match name.split_once('_') {
        Some((prefix, rest)) if is_family(prefix) && !rest.is_empty() => {
            Ok(FieldTarget::Attribute(AttrKey::new(prefix, rest)))
        }
        Some((app, field)) if !app.is_empty() && !field.is_empty() => {
            Ok(FieldTarget::Extension { app: app.to_owned(), field: field.to_owned() })
        }
        _ => Ok(FieldTarget::Attribute(AttrKey::single(name))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(lookup("mono", Some("dspacing")), Some(FieldType::Quantity));
        assert_eq!(lookup("scan", Some("edge")), Some(FieldType::Edge));
        assert_eq!(lookup("mu_transmission", None), Some(FieldType::Formula));
        assert_eq!(lookup("mono", Some("color")), None);
        assert!(is_family("sample"));
        assert!(!is_family("abscissa"));
        assert!(!is_family("myapp"));
    }

    #[test]
    fn test_canonical_name() {
        assert_eq!(canonical_name("Mono.D-Spacing"), "mono.d_spacing");
        assert_eq!(canonical_name(" Scan.start_time "), "scan.start_time");
    }

    #[test]
    fn test_classify_two_level() {
        let t = classify("mono.name", "Si(111)").unwrap();
        assert_eq!(t, FieldTarget::Attribute(AttrKey::new("mono", "name")));

        // unknown member of a known family and unknown family are both accepted
        assert!(classify("mono.color", "blue").is_ok());
        assert_eq!(
            classify("element.symbol", "Fe").unwrap(),
            FieldTarget::Attribute(AttrKey::new("element", "symbol"))
        );

        assert!(classify("mono.dspacing", "wide").is_err());
        assert!(classify("scan.edge", "L4").is_err());
        assert!(classify("scan.start_time", "yesterday").is_err());
        assert!(classify("facility.name", "").is_err());
        assert!(classify("mono.a.b", "x").is_err());
    }

    #[test]
    fn test_classify_single_and_extension() {
        assert_eq!(
            classify("abscissa", "$1").unwrap(),
            FieldTarget::Attribute(AttrKey::single("abscissa"))
        );
        assert!(classify("mu_transmission", "$3*exp(-$2)").is_err());

        assert_eq!(
            classify("mono_name", "Si(311)").unwrap(),
            FieldTarget::Attribute(AttrKey::new("mono", "name"))
        );
        assert_eq!(
            classify("myapp_gain", "1e6").unwrap(),
            FieldTarget::Extension { app: "myapp".to_owned(), field: "gain".to_owned() }
        );
        assert_eq!(
            classify("bogus", "x").unwrap(),
            FieldTarget::Attribute(AttrKey::single("bogus"))
        );
        assert!(classify("bogus!name", "x").is_err());
        assert!(classify("", "x").is_err());
    }

    #[test]
    fn test_key_names() {
        let k: AttrKey = "Mono.name".parse().unwrap();
        assert_eq!(k, AttrKey::new("mono", "name"));
        assert_eq!(k.to_string(), "mono.name");
        assert_eq!(k.header_name(), "Mono.name");
        assert_eq!(AttrKey::single("mu_transmission").header_name(), "Mu_transmission");
    }
}
