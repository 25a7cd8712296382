//! Errors and warnings raised while reading, deriving, or writing XDI data
use std::fmt::Display;

use crate::columns::ColumnName;

/// Type alias for a `Result` with [`RError`] as the error type.
pub type RResult<T> = Result<T, RError>;

/// Type alias for a `Result` with [`WError`] as the error type.
pub type WResult<T> = Result<T, WError>;

/// The category of a fatal read error, without its details.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Format,
    Field,
    Comment,
    Label,
    DataShape,
    DataValue,
    ReadFailure,
}

/// A fatal error while reading an XDI file. No partial document is returned when
/// one of these occurs.
///
/// Line numbers are 1-based and count every physical line of the input.
#[derive(Debug)]
pub enum RError {
    /// Indicates that the input does not start with an `XDI/<version>` line.
    Format { reason: String },
    /// Indicates an invalid field name or value in the header.
    Field { line_num: usize, line: String, reason: String },
    /// Indicates a comment line with non-printable characters or without a comment prefix.
    Comment { line_num: usize, line: String },
    /// Indicates a malformed column label, or a label line with no labels (empty `token`).
    Label { line_num: usize, line: String, token: String },
    /// Indicates that a data row has a different number of values than expected.
    DataShape { line_num: usize, line: String, expected: usize, found: usize },
    /// Indicates a data value that is not a number, `nan`, or `inf`.
    DataValue { line_num: usize, line: String, token: String },
    /// Indicates that there was an I/O error while reading in a line.
    ReadFailure(std::io::Error, usize),
}

impl RError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RError::Format { .. } => ErrorKind::Format,
            RError::Field { .. } => ErrorKind::Field,
            RError::Comment { .. } => ErrorKind::Comment,
            RError::Label { .. } => ErrorKind::Label,
            RError::DataShape { .. } => ErrorKind::DataShape,
            RError::DataValue { .. } => ErrorKind::DataValue,
            RError::ReadFailure(_, _) => ErrorKind::ReadFailure,
        }
    }

    /// The line the error occurred on, if it is tied to one.
    pub fn line_num(&self) -> Option<usize> {
        match self {
            RError::Format { .. } => None,
            RError::Field { line_num, .. }
            | RError::Comment { line_num, .. }
            | RError::Label { line_num, .. }
            | RError::DataShape { line_num, .. }
            | RError::DataValue { line_num, .. } => Some(*line_num),
            RError::ReadFailure(_, line_num) => Some(*line_num),
        }
    }
}

impl Display for RError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Format { reason } => write!(f, "Not an XDI file: {reason}"),
            Self::Field { line_num, line, reason } => {
                write!(f, "Invalid field on line {line_num} ('{line}'): {reason}")
            }
            Self::Comment { line_num, line } => {
                write!(f, "Invalid comment on line {line_num}: '{line}'")
            }
            Self::Label { line_num, line, token } if token.is_empty() => {
                write!(f, "Expected column labels on line {line_num}, found '{line}'")
            }
            Self::Label { line_num, line, token } => {
                write!(f, "Invalid column label '{token}' on line {line_num} ('{line}')")
            }
            Self::DataShape { line_num, line, expected, found } => {
                write!(
                    f,
                    "Line {line_num} of the data block has {found} values, expected {expected} ('{line}')"
                )
            }
            Self::DataValue { line_num, line, token } => {
                write!(f, "Value '{token}' on line {line_num} is not a number ('{line}')")
            }
            Self::ReadFailure(e, line_num) => write!(f, "Error reading line {line_num}: {e}"),
        }
    }
}

impl std::error::Error for RError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFailure(e, _) => Some(e),
            _ => None,
        }
    }
}

/// A non-fatal problem resolving one of a document's arrays.
///
/// The affected array is simply absent from the document; everything else can
/// still be used.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DerivationWarning {
    /// Indicates that a column index (declared or inferred) is outside the data block.
    IndexOutOfRange { column: ColumnName, index: usize, ncols: usize },
    /// Indicates that a formula field was given, but the arrays it needs are missing.
    MissingInputs { column: ColumnName, needs: Vec<ColumnName> },
}

impl Display for DerivationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IndexOutOfRange { column, index, ncols } => {
                write!(
                    f,
                    "Column {index} for '{column}' is outside the data block, which has {ncols} columns"
                )
            }
            Self::MissingInputs { column, needs } => {
                let needs: Vec<&str> = needs.iter().map(|c| c.as_str()).collect();
                write!(f, "Cannot derive '{column}': it requires {}", needs.join(", "))
            }
        }
    }
}

/// Errors that can occur while writing a document as XDI text
#[derive(Debug)]
pub enum WError {
    /// Indicates that no energy column could be resolved, so the file would have no abscissa.
    MissingEnergy,
    /// Indicates that a row of the data matrix does not have one value per column label.
    RowShape { row: usize, expected: usize, found: usize },
    /// Indicates an error writing the data
    Io(std::io::Error),
}

impl Display for WError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingEnergy => write!(f, "Cannot write an XDI file without an energy column"),
            Self::RowShape { row, expected, found } => {
                write!(
                    f,
                    "Data row {row} has {found} values but there are {expected} column labels"
                )
            }
            Self::Io(e) => write!(f, "Error writing data: {e}"),
        }
    }
}

impl std::error::Error for WError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for WError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}
