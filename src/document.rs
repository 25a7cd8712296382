//! The in-memory representation of one XDI file.
use std::collections::BTreeMap;

use crate::arrays::{self, DataArray};
use crate::columns::ColumnName;
use crate::registry::AttrKey;
use crate::xdi_error::DerivationWarning;

/// A parsed XDI file.
///
/// Documents are produced by the reader (see [`crate::reader`]) in a single pass and
/// are read-only afterwards, apart from array derivation. The writer (see
/// [`crate::writer`]) turns a document back into XDI text.
///
/// ```
/// use xdiformat::{XdiDocument, ColumnName};
///
/// let text = concat!(
///     "# XDI/1.0 GSE/1.0\n",
///     "# Column.1: energy\n",
///     "# Column.2: i0\n",
///     "# Column.3: itrans\n",
///     "# Mono.name: Si(111)\n",
///     "# ///\n",
///     "# ----\n",
///     "# energy i0 itrans\n",
///     "7100.0 1.02 0.55\n",
/// );
/// let doc: XdiDocument = text.parse().unwrap();
/// assert_eq!(doc.attribute("mono", "name"), Some("Si(111)"));
/// assert_eq!(doc.get_array(ColumnName::Energy), Some(&[7100.0][..]));
/// assert!(doc.get_array(ColumnName::MuTrans).is_some());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct XdiDocument {
    pub(crate) file_version: String,
    pub(crate) application_info: BTreeMap<String, String>,
    pub(crate) attributes: BTreeMap<AttrKey, String>,
    pub(crate) extension_attributes: BTreeMap<String, BTreeMap<String, String>>,
    pub(crate) comments: Vec<String>,
    pub(crate) column_labels: Vec<String>,
    pub(crate) raw_matrix: Vec<Vec<f64>>,
    pub(crate) columns: BTreeMap<ColumnName, usize>,
    pub(crate) derived_arrays: BTreeMap<ColumnName, DataArray>,
    pub(crate) derivation_warnings: Vec<DerivationWarning>,
}

impl XdiDocument {
    /// The format version from the first line, e.g. `"1.0"`.
    pub fn file_version(&self) -> &str {
        &self.file_version
    }

    /// Applications named on the first line, mapped to their versions.
    pub fn application_info(&self) -> &BTreeMap<String, String> {
        &self.application_info
    }

    pub fn attributes(&self) -> &BTreeMap<AttrKey, String> {
        &self.attributes
    }

    /// Look up a `Family.member` attribute. Names are matched case-insensitively.
    pub fn attribute(&self, family: &str, member: &str) -> Option<&str> {
        self.attributes.get(&AttrKey::new(family, member)).map(|s| s.as_str())
    }

    /// Look up a single-level attribute such as `abscissa` or `mu_transmission`.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.attributes.get(&AttrKey::single(name)).map(|s| s.as_str())
    }

    /// Application-specific fields, grouped by application name.
    pub fn extension_attributes(&self) -> &BTreeMap<String, BTreeMap<String, String>> {
        &self.extension_attributes
    }

    /// Look up an application-specific field written as `APP_field`.
    pub fn extension(&self, app: &str, field: &str) -> Option<&str> {
        self.extension_attributes
            .get(&app.to_ascii_lowercase())?
            .get(&field.to_ascii_lowercase())
            .map(|s| s.as_str())
    }

    pub fn comments(&self) -> &[String] {
        &self.comments
    }

    pub fn column_labels(&self) -> &[String] {
        &self.column_labels
    }

    /// The data block, one inner `Vec` per row.
    pub fn raw_matrix(&self) -> &[Vec<f64>] {
        &self.raw_matrix
    }

    /// Number of rows (data points) in the data block.
    pub fn npts(&self) -> usize {
        self.raw_matrix.len()
    }

    /// Column indices (1-based) explicitly declared in the header.
    pub fn columns(&self) -> &BTreeMap<ColumnName, usize> {
        &self.columns
    }

    /// Column indices (1-based) declared in the header or inferred from the
    /// `abscissa` and `mu_*` formula fields. Declared indices take precedence.
    pub fn resolved_columns(&self) -> BTreeMap<ColumnName, usize> {
        arrays::resolve_columns(&self.columns, &self.attributes)
    }

    /// The array for a semantic column, either read from the data block or computed
    /// from other arrays. Returns `None` if it could not be resolved.
    pub fn get_array(&self, name: ColumnName) -> Option<&[f64]> {
        self.derived_arrays.get(&name).map(|a| a.as_slice())
    }

    pub fn derived_arrays(&self) -> &BTreeMap<ColumnName, DataArray> {
        &self.derived_arrays
    }

    /// Problems met while resolving arrays; the affected arrays are absent.
    pub fn derivation_warnings(&self) -> &[DerivationWarning] {
        &self.derivation_warnings
    }

    /// (Re)compute the semantic arrays from the data block.
    ///
    /// The reader calls this automatically unless told not to in its settings.
    pub fn derive_arrays(&mut self) {
        let (derived, warnings) = arrays::derive_arrays(self);
        self.derived_arrays = derived;
        self.derivation_warnings = warnings;
    }
}
