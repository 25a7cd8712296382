//! Write an [`XdiDocument`] as XDI text
//!
//! Output is deterministic: the version line, column declarations in vocabulary
//! order, an `Abscissa` line, attributes sorted by key, extension fields sorted by
//! application and field, then comments, labels, and data.
//!
//! Reading the output back gives the same attributes, comments, labels and data, with
//! one exception: the `Abscissa` line is always written, so a document without an
//! `abscissa` field gains one (`$N`, pointing at its energy column). The same goes for
//! `Mu_*` formulas if [`WriteSettings::do_emit_formulas`] is turned on.
//!
//! ```
//! use xdiformat::XdiDocument;
//! use xdiformat::writer::{to_string, WriteSettings};
//!
//! let text = "# XDI/1.0\n# Column.1: energy\n# Column.2: i0\n# ---\n# energy i0\n7100 1.5\n";
//! let doc: XdiDocument = text.parse().unwrap();
//! let out = to_string(&doc, &WriteSettings::default().with_precision(2)).unwrap();
//! assert!(out.starts_with("# XDI/1.0\n# Column_energy: 1\n# Column_i0: 2\n# Abscissa: $1\n"));
//! assert!(out.ends_with("# energy  i0\n  7100.00  1.50\n"));
//! ```
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use error_stack::ResultExt;
use itertools::Itertools;

use crate::columns::ColumnName;
use crate::document::XdiDocument;
use crate::math_expr::MathExpr;
use crate::registry::{capitalize, AttrKey};
use crate::xdi_error::{WError, WResult};

/// Settings controlling how a document is written.
#[derive(Debug, Clone, Copy)]
pub struct WriteSettings {
    precision: Option<usize>,
    emit_formulas: bool,
}

impl WriteSettings {
    /// Write data values with a fixed number of digits after the decimal point.
    ///
    /// By default each value is written with the fewest digits that read back to
    /// the same number.
    pub fn with_precision(mut self, precision: usize) -> Self {
        self.precision = Some(precision);
        self
    }

    /// Whether to add `Mu_*` formula fields for mu arrays that can be computed from the
    /// declared intensity columns but are not already described (default `false`).
    pub fn do_emit_formulas(mut self, emit: bool) -> Self {
        self.emit_formulas = emit;
        self
    }
}

impl Default for WriteSettings {
    fn default() -> Self {
        Self { precision: None, emit_formulas: false }
    }
}

/// Write `doc` to the file at `path` with default settings, replacing it if it exists.
pub fn write_file<P: AsRef<Path>>(doc: &XdiDocument, path: P) -> error_stack::Result<(), WError> {
    write_file_custom(doc, path, &WriteSettings::default())
}

/// Write `doc` to the file at `path`, replacing it if it exists.
pub fn write_file_custom<P: AsRef<Path>>(
    doc: &XdiDocument,
    path: P,
    settings: &WriteSettings,
) -> error_stack::Result<(), WError> {
    let path = path.as_ref();
    let f = File::create(path)
        .map_err(WError::from)
        .attach_printable_lazy(|| format!("could not create {}", path.display()))?;

    let mut buf = BufWriter::new(f);
    write(doc, &mut buf, settings)
        .and_then(|_| buf.flush().map_err(WError::from))
        .attach_printable_lazy(|| format!("in file {}", path.display()))
}

/// Serialize `doc` to a string.
pub fn to_string(doc: &XdiDocument, settings: &WriteSettings) -> WResult<String> {
    let mut buf = vec![];
    write(doc, &mut buf, settings)?;
    // Everything written is built from `str`s, so this cannot fail
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Serialize `doc` to `buf`.
///
/// Returns [`WError::MissingEnergy`] if no energy column can be resolved and
/// [`WError::RowShape`] if a data row does not have one value per label. Nothing is
/// written in either case.
pub fn write<W: Write>(doc: &XdiDocument, mut buf: W, settings: &WriteSettings) -> WResult<()> {
    let columns = doc.resolved_columns();
    let energy = *columns.get(&ColumnName::Energy).ok_or(WError::MissingEnergy)?;

    let expected = doc.column_labels.len();
    let bad_row = doc.raw_matrix.iter().enumerate().find(|(_, r)| r.len() != expected);
    if let Some((row, values)) = bad_row {
        return Err(WError::RowShape { row: row + 1, expected, found: values.len() });
    }

    let apps = doc
        .application_info
        .iter()
        .map(|(app, version)| match version.as_str() {
            "" => app.clone(),
            v => format!("{app}/{v}"),
        });
    let first_line = std::iter::once(format!("XDI/{}", doc.file_version)).chain(apps).join(" ");
    writeln!(buf, "# {first_line}")?;

    for (name, index) in columns.iter() {
        writeln!(buf, "# Column_{name}: {index}")?;
    }

    let abscissa_key = AttrKey::single("abscissa");
    match doc.attributes.get(&abscissa_key) {
        Some(formula) => writeln!(buf, "# Abscissa: {formula}")?,
        None => writeln!(buf, "# Abscissa: {}", MathExpr::column(energy))?,
    }

    if settings.emit_formulas {
        for (key, formula) in missing_formulas(doc, &columns) {
            writeln!(buf, "# {}: {formula}", key.header_name())?;
        }
    }

    for (key, value) in doc.attributes.iter().filter(|(k, _)| **k != abscissa_key) {
        writeln!(buf, "# {}: {value}", key.header_name())?;
    }

    for (app, fields) in doc.extension_attributes.iter() {
        for (field, value) in fields.iter() {
            writeln!(buf, "# {}_{field}: {value}", capitalize(app))?;
        }
    }

    writeln!(buf, "# ///")?;
    for comment in doc.comments.iter() {
        if comment.is_empty() {
            writeln!(buf, "#")?;
        } else {
            writeln!(buf, "# {comment}")?;
        }
    }
    writeln!(buf, "# ----")?;

    // A header-only document has no label line
    if !doc.column_labels.is_empty() {
        writeln!(buf, "# {}", doc.column_labels.iter().join("  "))?;
    }

    for row in doc.raw_matrix.iter() {
        let line = row.iter().map(|&v| format_value(v, settings.precision)).join("  ");
        writeln!(buf, "  {line}")?;
    }

    Ok(())
}

/// Formula fields for mu arrays that are derivable from resolved intensity columns but
/// neither declared as a column nor described by an existing formula field.
fn missing_formulas(
    doc: &XdiDocument,
    columns: &BTreeMap<ColumnName, usize>,
) -> Vec<(AttrKey, MathExpr)> {
    let candidates = [
        ("mu_transmission", ColumnName::MuTrans, ColumnName::ITrans, ColumnName::I0, true),
        ("mu_fluorescence", ColumnName::MuFluor, ColumnName::IFluor, ColumnName::I0, false),
        ("mu_reference", ColumnName::MuRefer, ColumnName::IRefer, ColumnName::ITrans, true),
    ];

    let mut formulas = vec![];
    for (field, mu, numerator, denominator, is_log) in candidates {
        let key = AttrKey::single(field);
        if doc.attributes.contains_key(&key) || columns.contains_key(&mu) {
            continue;
        }
        if let (Some(&n), Some(&d)) = (columns.get(&numerator), columns.get(&denominator)) {
            let expr = if is_log { MathExpr::neg_log_ratio(n, d) } else { MathExpr::ratio(n, d) };
            formulas.push((key, expr));
        }
    }
    formulas
}

fn format_value(v: f64, precision: Option<usize>) -> String {
    match precision {
        Some(p) => format!("{v:.p$}"),
        None if v == 0.0 || !v.is_finite() => format!("{v}"),
        None if v.abs() >= 1e15 || v.abs() < 1e-5 => format!("{v:e}"),
        None => format!("{v}"),
    }
}
