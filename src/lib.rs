//! Read, validate and write XDI (X-ray Absorption Data Interchange) files.
//!
//! An XDI file is a block of `# Family.member: value` header fields, optional free-text
//! comments, a line of column labels, and a whitespace-separated numeric table. This
//! crate reads such a file into an [`XdiDocument`], resolves which columns hold the
//! energy, intensities and absorption (mu), computes any of those arrays that can be
//! derived from the others, and writes documents back out as XDI text.
//!
//! ```
//! use xdiformat::{XdiDocument, ColumnName, WriteSettings};
//!
//! let text = concat!(
//!     "# XDI/1.0\n",
//!     "# Abscissa: $1\n",
//!     "# Mu_transmission: -ln($3/$2)\n",
//!     "# ----\n",
//!     "# energy i0 itrans\n",
//!     "7100.0 2.0 1.0\n",
//! );
//! let doc: XdiDocument = text.parse().unwrap();
//! assert_eq!(doc.get_array(ColumnName::MuTrans), Some(&[-(0.5f64).ln()][..]));
//!
//! let out = xdiformat::writer::to_string(&doc, &WriteSettings::default()).unwrap();
//! assert!(out.contains("# Column_itrans: 3\n"));
//! ```
//!
//! # Features
//! - `serde`: derive `Serialize` and `Deserialize` for documents and their parts.
//! - `dataframes`: export the data block as a polars `DataFrame`.
extern crate pest;
#[macro_use]
extern crate pest_derive;

pub mod xdi_error;
pub mod validators;
pub mod registry;
pub mod math_expr;
pub mod columns;
pub mod arrays;
pub mod document;
pub mod reader;
pub mod writer;
#[cfg(feature = "dataframes")]
pub mod dataframes;

pub use arrays::DataArray;
pub use columns::ColumnName;
pub use document::XdiDocument;
pub use reader::{read_file, ReadSettings};
pub use registry::AttrKey;
pub use writer::{write_file, WriteSettings};
pub use xdi_error::{DerivationWarning, RError, WError};
