//! Read XDI text into an [`XdiDocument`]
//!
//! # Basic usage
//!
//! The quickest way to read a file is [`read_file`], which attaches the file name to
//! any error it returns:
//!
//! ```no_run
//! use xdiformat::{read_file, ColumnName};
//!
//! let doc = read_file("cu_metal_rt.xdi").unwrap();
//! let energy = doc.get_array(ColumnName::Energy).unwrap();
//! println!("{} points from {} to {}", energy.len(), energy[0], energy[energy.len() - 1]);
//! ```
//!
//! In-memory text can be parsed with `str::parse`, and any buffered reader can be
//! read with [`XdiDocument::from_reader`].
//!
//! # File layout
//!
//! An XDI file is read with a small state machine:
//!
//! 1. The first non-blank line must be `# XDI/<version>`, optionally followed by
//!    `APP/<version>` tokens naming the programs that produced the file.
//! 2. Header fields `# Family.member: value` and column declarations follow, either
//!    `# Column.N: name` or `# Column_name: N`.
//! 3. A `# //` line starts free-text comments.
//! 4. A `# ---` line ends the header; the next line holds the column labels.
//! 5. Every remaining line is one row of whitespace-separated numbers.
//!
//! Header lines may be prefixed with `#` or `;`. Any error stops reading; the
//! returned [`RError`] gives the line number and text where it happened.
//!
//! # Adjusting read settings
//!
//! By default the semantic arrays (energy, mu, etc.) are resolved as soon as the
//! file is read. To only read the raw data, turn that off:
//!
//! ```
//! use xdiformat::reader::ReadSettings;
//! use xdiformat::XdiDocument;
//!
//! let text = "# XDI/1.0\n# Column.1: energy\n# ---\n# energy\n7100.0\n";
//! let settings = ReadSettings::default().do_derive(false);
//! let mut doc = XdiDocument::from_str_custom(text, &settings).unwrap();
//! assert!(doc.derived_arrays().is_empty());
//! doc.derive_arrays();
//! assert_eq!(doc.derived_arrays().len(), 1);
//! ```
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::str::FromStr;

use error_stack::ResultExt;
use log::debug;

use crate::columns::ColumnName;
use crate::document::XdiDocument;
use crate::registry::{canonical_name, classify, AttrKey, FieldTarget};
use crate::validators::{is_float_or_special, is_identifier, is_int, is_printable};
use crate::xdi_error::{RError, RResult};

/// Settings controlling how XDI text is read.
#[derive(Debug, Clone, Copy)]
pub struct ReadSettings {
    derive: bool,
}

impl ReadSettings {
    /// Whether to resolve and compute the semantic arrays after reading (default `true`).
    pub fn do_derive(mut self, derive: bool) -> Self {
        self.derive = derive;
        self
    }
}

impl Default for ReadSettings {
    fn default() -> Self {
        Self { derive: true }
    }
}

/// Read the XDI file at `path` with default settings.
pub fn read_file<P: AsRef<Path>>(path: P) -> error_stack::Result<XdiDocument, RError> {
    read_file_custom(path, &ReadSettings::default())
}

/// Read the XDI file at `path`. The path is attached to the error report on failure.
pub fn read_file_custom<P: AsRef<Path>>(
    path: P,
    settings: &ReadSettings,
) -> error_stack::Result<XdiDocument, RError> {
    let path = path.as_ref();
    let f = File::open(path)
        .map_err(|e| RError::ReadFailure(e, 0))
        .attach_printable_lazy(|| format!("could not open {}", path.display()))?;

    XdiDocument::from_reader(BufReader::new(f), settings)
        .attach_printable_lazy(|| format!("in file {}", path.display()))
}

impl XdiDocument {
    /// Read a document from a buffered reader.
    pub fn from_reader<R: Read>(f: BufReader<R>, settings: &ReadSettings) -> RResult<Self> {
        let mut parser = LineParser::new();
        for (i, line) in f.lines().enumerate() {
            let line = line.map_err(|e| RError::ReadFailure(e, i + 1))?;
            parser.feed(i + 1, &line)?;
        }
        parser.finish(settings)
    }

    /// Read a document from a string with custom settings.
    pub fn from_str_custom(s: &str, settings: &ReadSettings) -> RResult<Self> {
        let mut parser = LineParser::new();
        for (i, line) in s.lines().enumerate() {
            parser.feed(i + 1, line)?;
        }
        parser.finish(settings)
    }
}

impl FromStr for XdiDocument {
    type Err = RError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_custom(s, &ReadSettings::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Version,
    Fields,
    Comments,
    Labels,
    Data,
}

/// Strip a leading `#` or `;` and one following space.
///
/// Returns `None` if the line has neither prefix.
fn strip_comment_prefix(line: &str) -> Option<&str> {
    let line = line.trim_start();
    let rest = line.strip_prefix('#').or_else(|| line.strip_prefix(';'))?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

struct LineParser {
    state: State,
    doc: XdiDocument,
    ncols: Option<usize>,
}

impl LineParser {
    fn new() -> Self {
        Self { state: State::Version, doc: XdiDocument::default(), ncols: None }
    }

    fn transition(&mut self, state: State, line_num: usize) {
        debug!("{:?} -> {:?} at line {line_num}", self.state, state);
        self.state = state;
    }

    fn feed(&mut self, line_num: usize, line: &str) -> RResult<()> {
        if line.trim().is_empty() {
            return Ok(());
        }

        match self.state {
            State::Version => self.parse_version(line_num, line),
            State::Fields => self.parse_field_line(line_num, line),
            State::Comments => self.parse_comment_line(line_num, line),
            State::Labels => self.parse_labels(line_num, line),
            State::Data => self.parse_data(line_num, line),
        }
    }

    fn finish(self, settings: &ReadSettings) -> RResult<XdiDocument> {
        if self.state == State::Version {
            return Err(RError::Format { reason: "input is empty".to_owned() });
        }

        let mut doc = self.doc;
        if settings.derive {
            doc.derive_arrays();
        }
        Ok(doc)
    }

    fn parse_version(&mut self, line_num: usize, line: &str) -> RResult<()> {
        let body = strip_comment_prefix(line).unwrap_or(line);
        let mut tokens = body.split_whitespace();

        let version = tokens
            .next()
            .and_then(|t| t.strip_prefix("XDI/").or_else(|| t.strip_prefix("xdi/")))
            .ok_or_else(|| RError::Format {
                reason: format!("first line '{line}' does not start with XDI/<version>"),
            })?;
        if version.is_empty() {
            let reason = format!("first line '{line}' has no XDI version");
            return Err(RError::Format { reason });
        }
        self.doc.file_version = version.to_owned();

        for token in tokens {
            let (app, app_version) = token.split_once('/').unwrap_or((token, ""));
            self.doc.application_info.insert(app.to_owned(), app_version.to_owned());
        }

        self.transition(State::Fields, line_num);
        Ok(())
    }

    fn parse_field_line(&mut self, line_num: usize, line: &str) -> RResult<()> {
        let body = strip_comment_prefix(line)
            .ok_or_else(|| field_error(line_num, line, "header lines must start with '#'"))?
            .trim();

        if body.is_empty() {
            Ok(())
        } else if body.starts_with("//") {
            self.transition(State::Comments, line_num);
            Ok(())
        } else if body.starts_with("---") {
            self.transition(State::Labels, line_num);
            Ok(())
        } else {
            self.parse_field(line_num, line, body)
        }
    }

    fn parse_field(&mut self, line_num: usize, line: &str, body: &str) -> RResult<()> {
        let (raw_name, value) = body
            .split_once(':')
            .ok_or_else(|| field_error(line_num, line, "expected 'name: value'"))?;
        let name = canonical_name(raw_name);
        let value = value.trim();

        if let Some(column) = name.strip_prefix("column_") {
            let column: ColumnName = column.parse().map_err(|e| field_error(line_num, line, e))?;
            let index = parse_column_index(value).ok_or_else(|| {
                let reason = format!("column index '{value}' is not a positive integer");
                field_error(line_num, line, reason)
            })?;
            self.doc.columns.insert(column, index);
            return Ok(());
        }

        if let Some(number) = name.strip_prefix("column.") {
            let index = parse_column_index(number).ok_or_else(|| {
                let reason = format!("column number '{number}' is not a positive integer");
                field_error(line_num, line, reason)
            })?;
            let label = value.split_whitespace().next().unwrap_or("");
            if let Ok(column) = label.parse::<ColumnName>() {
                self.doc.columns.insert(column, index);
            } else if !value.is_empty() && is_printable(value) {
                self.doc.attributes.insert(AttrKey::new("column", number), value.to_owned());
            } else {
                let reason = format!("invalid column description '{value}'");
                return Err(field_error(line_num, line, reason));
            }
            return Ok(());
        }

        match classify(&name, value).map_err(|reason| field_error(line_num, line, reason))? {
            FieldTarget::Attribute(key) => {
                self.doc.attributes.insert(key, value.to_owned());
            }
            FieldTarget::Extension { app, field } => {
                self.doc
                    .extension_attributes
                    .entry(app)
                    .or_default()
                    .insert(field, value.to_owned());
            }
        }
        Ok(())
    }

    fn parse_comment_line(&mut self, line_num: usize, line: &str) -> RResult<()> {
        let body = strip_comment_prefix(line)
            .ok_or_else(|| RError::Comment { line_num, line: line.to_owned() })?;

        if body.trim_start().starts_with("---") {
            self.transition(State::Labels, line_num);
            return Ok(());
        }

        if !is_printable(body) {
            return Err(RError::Comment { line_num, line: line.to_owned() });
        }
        self.doc.comments.push(body.trim_end().to_owned());
        Ok(())
    }

    fn parse_labels(&mut self, line_num: usize, line: &str) -> RResult<()> {
        let body = strip_comment_prefix(line).ok_or_else(|| RError::Label {
            line_num,
            line: line.to_owned(),
            token: line.trim().to_owned(),
        })?;

        if body.trim().is_empty() {
            return Err(RError::Label { line_num, line: line.to_owned(), token: String::new() });
        }

        let mut labels = vec![];
        for token in body.split_whitespace() {
            if !is_identifier(token) {
                return Err(RError::Label {
                    line_num,
                    line: line.to_owned(),
                    token: token.to_owned(),
                });
            }
            labels.push(token.to_owned());
        }

        self.doc.column_labels = labels;
        self.transition(State::Data, line_num);
        Ok(())
    }

    fn parse_data(&mut self, line_num: usize, line: &str) -> RResult<()> {
        let tokens: Vec<&str> = line.split_whitespace().collect();

        let expected = match self.ncols {
            Some(n) => n,
            None if !self.doc.column_labels.is_empty() => self.doc.column_labels.len(),
            None => tokens.len(),
        };
        if tokens.len() != expected {
            return Err(RError::DataShape {
                line_num,
                line: line.to_owned(),
                expected,
                found: tokens.len(),
            });
        }
        self.ncols = Some(expected);

        let mut row = Vec::with_capacity(tokens.len());
        for token in tokens {
            let value = if is_float_or_special(token) { token.parse::<f64>().ok() } else { None };
            let value = value.ok_or_else(|| RError::DataValue {
                line_num,
                line: line.to_owned(),
                token: token.to_owned(),
            })?;
            row.push(value);
        }
        self.doc.raw_matrix.push(row);
        Ok(())
    }
}

fn field_error<S: ToString>(line_num: usize, line: &str, reason: S) -> RError {
    RError::Field { line_num, line: line.to_owned(), reason: reason.to_string() }
}

fn parse_column_index(s: &str) -> Option<usize> {
    if !is_int(s) {
        return None;
    }
    s.parse::<usize>().ok().filter(|&i| i > 0)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use stringreader::StringReader;

    use super::*;
    use crate::xdi_error::ErrorKind;

    const EXAMPLE: &str = "# XDI/1.0 APPNAME/1.2.3
# Column.1: energy
# Column.2: i0
# Column.3: itrans
# Mono.name: Si(111)
# Mono.dspacing: 3.1356
# Facility.name: APS
# ///
# free-text comment lines
# ----
#  energy  i0  itrans
  7100.0   1.02   0.55
  7102.0   1.01   0.54
";

    fn read(s: &str) -> RResult<XdiDocument> {
        XdiDocument::from_reader(BufReader::new(StringReader::new(s)), &ReadSettings::default())
    }

    #[test]
    fn test_example_file() -> RResult<()> {
        let doc = read(EXAMPLE)?;
        assert_eq!(doc.file_version(), "1.0");
        assert_eq!(doc.application_info().get("APPNAME").map(|s| s.as_str()), Some("1.2.3"));

        let expected_cols: BTreeMap<ColumnName, usize> =
            [(ColumnName::Energy, 1), (ColumnName::I0, 2), (ColumnName::ITrans, 3)]
                .into_iter()
                .collect();
        assert_eq!(doc.columns(), &expected_cols);

        assert_eq!(doc.attribute("mono", "name"), Some("Si(111)"));
        assert_eq!(doc.attribute("Mono", "dspacing"), Some("3.1356"));
        assert_eq!(doc.attribute("facility", "name"), Some("APS"));
        assert_eq!(doc.comments(), &["free-text comment lines".to_owned()]);
        assert_eq!(doc.column_labels(), &["energy", "i0", "itrans"]);
        assert_eq!(doc.raw_matrix(), &[vec![7100.0, 1.02, 0.55], vec![7102.0, 1.01, 0.54]]);

        assert_eq!(doc.get_array(ColumnName::Energy), Some(&[7100.0, 7102.0][..]));
        let mu = doc.get_array(ColumnName::MuTrans).unwrap();
        assert_eq!(mu, &[-(0.55f64 / 1.02).ln(), -(0.54f64 / 1.01).ln()]);
        Ok(())
    }

    #[test]
    fn test_from_str_matches_reader() -> RResult<()> {
        let a: XdiDocument = EXAMPLE.parse()?;
        let b = read(EXAMPLE)?;
        assert_eq!(a, b);
        Ok(())
    }

    #[test]
    fn test_fields() -> RResult<()> {
        let text = "; XDI/1.1 GSE/1.0 Larch
; Column_energy: 1
; Column-I0: 2
; Scan.edge: k
; Scan.start_time: 2013-04-01T14:05:09
; Mu_transmission: -ln($3/$2)
; Element.symbol: Cu
; GSE_EXTRA: 42
;
; ---
; e i0 it
1 2 3
";
        let doc = read(text)?;
        assert_eq!(doc.file_version(), "1.1");
        assert_eq!(doc.application_info().get("Larch").map(|s| s.as_str()), Some(""));
        assert_eq!(doc.columns().get(&ColumnName::I0), Some(&2));
        assert_eq!(doc.attribute("scan", "edge"), Some("k"));
        assert_eq!(doc.field("mu_transmission"), Some("-ln($3/$2)"));
        assert_eq!(doc.attribute("element", "symbol"), Some("Cu"));
        assert_eq!(doc.extension("gse", "extra"), Some("42"));
        assert!(
            doc.attributes().keys().all(|k| k.family() != "gse"),
            "Extension field leaked into attributes"
        );
        assert!(doc.comments().is_empty());

        // itrans is recovered from the formula
        assert_eq!(doc.get_array(ColumnName::ITrans), Some(&[3.0][..]));
        Ok(())
    }

    #[test]
    fn test_column_dot_unknown_label() -> RResult<()> {
        let text = "# XDI/1.0\n# Column.1: energy eV\n# Column.2: pre_edge\n# ---\n# energy pre_edge\n1 2\n";
        let doc = read(text)?;
        assert_eq!(doc.columns().get(&ColumnName::Energy), Some(&1));
        assert_eq!(doc.attribute("column", "2"), Some("pre_edge"));
        Ok(())
    }

    #[test]
    fn test_bad_header() {
        for text in ["", "\n\n", "# Column.1: energy\n", "# XDI/\n", "XDI 1.0\n"] {
            let err = read(text).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Format, "'{text}' should be a format error");
            assert_eq!(err.line_num(), None);
        }

        // the prefix is optional on the first line, and leading blank lines are skipped
        assert!(read("\nXDI/1.0\n").is_ok());
    }

    #[test]
    fn test_field_errors() {
        let err = read("# XDI/1.0\n# Bogus!Name: x\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Field);
        assert_eq!(err.line_num(), Some(2));

        let cases = [
            "# XDI/1.0\nMono.name: Si\n",
            "# XDI/1.0\n# Mono.name Si\n",
            "# XDI/1.0\n# Mono.dspacing: wide\n",
            "# XDI/1.0\n# Column_bogus: 1\n",
            "# XDI/1.0\n# Column_energy: 0\n",
            "# XDI/1.0\n# Column.x: energy\n",
            "# XDI/1.0\n# Scan.edge: L4\n",
            "# XDI/1.0\n# Abscissa: $3*exp(-$2)\n",
        ];
        for text in cases {
            let err = read(text).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Field, "'{text}' should be a field error");
            assert_eq!(err.line_num(), Some(2));
        }
    }

    #[test]
    fn test_comment_errors() {
        let err = read("# XDI/1.0\n# //\n# fine\n# not \u{7} fine\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Comment);
        assert_eq!(err.line_num(), Some(4));

        let err = read("# XDI/1.0\n# //\nno prefix\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Comment);
    }

    #[test]
    fn test_label_errors() {
        let err = read("# XDI/1.0\n# ---\n# energy 2theta\n").unwrap_err();
        if let RError::Label { line_num, token, .. } = err {
            assert_eq!(line_num, 3);
            assert_eq!(token, "2theta");
        } else {
            assert!(false, "Wrong error type");
        }

        // a label line is required before the data rows
        let err = read("# XDI/1.0\n# Column.1: energy\n# ---\n#\n1 2 3\n").unwrap_err();
        if let RError::Label { line_num, token, .. } = err {
            assert_eq!(line_num, 4);
            assert!(token.is_empty());
        } else {
            assert!(false, "Wrong error type");
        }
    }

    #[test]
    fn test_data_shape_error() {
        let err = read("# XDI/1.0\n# ---\n# a b c\n1 2 3\n1 2\n").unwrap_err();
        if let RError::DataShape { line_num, expected, found, .. } = err {
            assert_eq!(line_num, 5);
            assert_eq!(expected, 3);
            assert_eq!(found, 2);
        } else {
            assert!(false, "Wrong error type");
        }

        // the first row must also agree with the labels
        let err = read("# XDI/1.0\n# ---\n# a b\n1 2 3\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataShape);
        assert_eq!(err.line_num(), Some(4));
    }

    #[test]
    fn test_data_values() -> RResult<()> {
        let doc = read("# XDI/1.0\n# ---\n# a b\n1 nan\n-inf 2e3\n")?;
        assert!(doc.raw_matrix()[0][1].is_nan());
        assert_eq!(doc.raw_matrix()[1], vec![f64::NEG_INFINITY, 2000.0]);

        let err = read("# XDI/1.0\n# ---\n# a b\n1 2\n1 x\n").unwrap_err();
        if let RError::DataValue { line_num, token, .. } = err {
            assert_eq!(line_num, 5);
            assert_eq!(token, "x");
        } else {
            assert!(false, "Wrong error type");
        }
        Ok(())
    }

    #[test]
    fn test_shape_invariant() -> RResult<()> {
        let doc = read(EXAMPLE)?;
        for row in doc.raw_matrix() {
            assert_eq!(row.len(), doc.column_labels().len());
        }
        Ok(())
    }

    #[test]
    fn test_header_only() -> RResult<()> {
        let doc = read("# XDI/1.0\n# Mono.name: Si(311)\n")?;
        assert_eq!(doc.npts(), 0);
        assert!(doc.column_labels().is_empty());
        Ok(())
    }

    #[test]
    fn test_read_missing_file() {
        let report = read_file("/nonexistent/dir/missing.xdi").unwrap_err();
        assert_eq!(report.current_context().kind(), ErrorKind::ReadFailure);
        assert!(format!("{report:?}").contains("missing.xdi"));
    }
}
