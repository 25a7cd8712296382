//! Resolve semantic columns and compute the arrays a document does not store directly.
//!
//! Column indices come from explicit `Column` declarations first. Any semantic name
//! still missing can be recovered from the formula fields:
//!
//! | field             | formula       | inferred columns              |
//! |-------------------|---------------|-------------------------------|
//! | `abscissa`        | `$a`          | `energy = a`                  |
//! | `mu_transmission` | `-ln($a/$b)`  | `itrans = a`, `i0 = b`        |
//! | `mu_transmission` | `ln($a/$b)`   | `i0 = a`, `itrans = b`        |
//! | `mu_reference`    | `-ln($a/$b)`  | `irefer = a`, `itrans = b`    |
//! | `mu_reference`    | `ln($a/$b)`   | `itrans = a`, `irefer = b`    |
//! | `mu_fluorescence` | `$a/$b`       | `ifluor = a`, `i0 = b`        |
//! | `mu_fluorescence` | `$a`          | `ifluor = a`                  |
//!
//! Once the columns present in the data block are copied out, missing intensity or
//! mu arrays are computed from their partners:
//!
//! - `mutrans = -ln(itrans / i0)`, `itrans = i0 * exp(-mutrans)`
//! - `mufluor = ifluor / i0`, `ifluor = mufluor * i0`
//! - `murefer = -ln(irefer / itrans)`, `irefer = itrans * exp(-murefer)`
//!
//! Logarithms of non-positive ratios give NaN or infinite values, which are kept as is.
use std::collections::BTreeMap;
use std::ops::Deref;

use itertools::Itertools;
use log::{debug, warn};

use crate::columns::ColumnName;
use crate::document::XdiDocument;
use crate::math_expr::{Func, MathExpr, Op, Sign};
use crate::registry::AttrKey;
use crate::xdi_error::DerivationWarning;

/// An owned sequence of values for one semantic column.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct DataArray(Vec<f64>);

impl DataArray {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.0
    }

    /// Apply `f` elementwise.
    pub fn map<F: Fn(f64) -> f64>(&self, f: F) -> Self {
        Self(self.0.iter().map(|&v| f(v)).collect())
    }

    /// Combine two arrays elementwise with `f`.
    ///
    /// # Panics
    /// If the arrays have different lengths. Arrays from the same document always
    /// have one value per row of the data block.
    pub fn zip_with<F: Fn(f64, f64) -> f64>(&self, other: &Self, f: F) -> Self {
        Self(self.0.iter().zip_eq(other.0.iter()).map(|(&a, &b)| f(a, b)).collect())
    }
}

impl Deref for DataArray {
    type Target = [f64];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<f64>> for DataArray {
    fn from(value: Vec<f64>) -> Self {
        Self(value)
    }
}

/// Formula fields, the mu column they describe, and the input columns that mu is computed from.
const FORMULA_FIELDS: [(&str, ColumnName, [ColumnName; 2]); 3] = [
    ("mu_transmission", ColumnName::MuTrans, [ColumnName::I0, ColumnName::ITrans]),
    ("mu_fluorescence", ColumnName::MuFluor, [ColumnName::I0, ColumnName::IFluor]),
    ("mu_reference", ColumnName::MuRefer, [ColumnName::ITrans, ColumnName::IRefer]),
];

fn formula(attributes: &BTreeMap<AttrKey, String>, name: &str) -> Option<MathExpr> {
    attributes.get(&AttrKey::single(name)).and_then(|v| MathExpr::parse(v))
}

fn assign(resolved: &mut BTreeMap<ColumnName, usize>, name: ColumnName, index: usize) {
    if !resolved.contains_key(&name) {
        debug!("Inferred column {index} as '{name}' from a formula field");
        resolved.insert(name, index);
    }
}

/// Combine explicit column declarations with columns inferred from formula fields.
pub(crate) fn resolve_columns(
    explicit: &BTreeMap<ColumnName, usize>,
    attributes: &BTreeMap<AttrKey, String>,
) -> BTreeMap<ColumnName, usize> {
    let mut resolved = explicit.clone();

    if let Some(e) = formula(attributes, "abscissa") {
        assign(&mut resolved, ColumnName::Energy, e.left);
    }

    if let Some(e) = formula(attributes, "mu_transmission") {
        if let (Func::Ln, Some((Op::Div, right))) = (e.func, e.rhs()) {
            let (itrans, i0) = match e.sign {
                Sign::Negative => (e.left, right),
                Sign::Positive => (right, e.left),
            };
            assign(&mut resolved, ColumnName::ITrans, itrans);
            assign(&mut resolved, ColumnName::I0, i0);
        }
    }

    if let Some(e) = formula(attributes, "mu_reference") {
        if let (Func::Ln, Some((Op::Div, right))) = (e.func, e.rhs()) {
            let (irefer, itrans) = match e.sign {
                Sign::Negative => (e.left, right),
                Sign::Positive => (right, e.left),
            };
            assign(&mut resolved, ColumnName::IRefer, irefer);
            assign(&mut resolved, ColumnName::ITrans, itrans);
        }
    }

    if let Some(e) = formula(attributes, "mu_fluorescence") {
        if let (Func::Identity, Sign::Positive) = (e.func, e.sign) {
            match e.rhs() {
                Some((Op::Div, i0)) => {
                    assign(&mut resolved, ColumnName::IFluor, e.left);
                    assign(&mut resolved, ColumnName::I0, i0);
                }
                None => assign(&mut resolved, ColumnName::IFluor, e.left),
                Some((Op::Mul, _)) => {}
            }
        }
    }

    resolved
}

/// Copy the resolved columns out of the data block and compute the missing partners.
pub(crate) fn derive_arrays(
    doc: &XdiDocument,
) -> (BTreeMap<ColumnName, DataArray>, Vec<DerivationWarning>) {
    use ColumnName::{IFluor, IRefer, ITrans, MuFluor, MuRefer, MuTrans, I0};

    let mut arrays = BTreeMap::new();
    let mut warnings = vec![];

    let ncols = doc.raw_matrix.first().map(|r| r.len()).unwrap_or(doc.column_labels.len());
    for (name, index) in doc.resolved_columns() {
        if index == 0 || index > ncols {
            warnings.push(DerivationWarning::IndexOutOfRange { column: name, index, ncols });
            continue;
        }
        let values = doc
            .raw_matrix
            .iter()
            .map(|row| row.get(index - 1).copied().unwrap_or(f64::NAN))
            .collect();
        arrays.insert(name, DataArray::new(values));
    }

    // Transmission first, so that a computed itrans can feed the reference pair
    fill(&mut arrays, MuTrans, ITrans, I0, |it, i0| -(it / i0).ln());
    fill(&mut arrays, ITrans, I0, MuTrans, |i0, mu| i0 * (-mu).exp());
    fill(&mut arrays, MuFluor, IFluor, I0, |ifl, i0| ifl / i0);
    fill(&mut arrays, IFluor, MuFluor, I0, |mu, i0| mu * i0);
    fill(&mut arrays, MuRefer, IRefer, ITrans, |ir, it| -(ir / it).ln());
    fill(&mut arrays, IRefer, ITrans, MuRefer, |it, mu| it * (-mu).exp());

    for (field, mu, inputs) in FORMULA_FIELDS {
        if doc.attributes.contains_key(&AttrKey::single(field)) && !arrays.contains_key(&mu) {
            let needs = inputs.into_iter().filter(|c| !arrays.contains_key(c)).collect();
            warnings.push(DerivationWarning::MissingInputs { column: mu, needs });
        }
    }

    for w in warnings.iter() {
        warn!("{w}");
    }

    (arrays, warnings)
}

/// Compute `target` from `a` and `b` with `f`.
///
/// Does nothing if `target` already exists or an input is missing.
fn fill<F: Fn(f64, f64) -> f64>(
    arrays: &mut BTreeMap<ColumnName, DataArray>,
    target: ColumnName,
    a: ColumnName,
    b: ColumnName,
    f: F,
) {
    if arrays.contains_key(&target) {
        return;
    }
    let values = match (arrays.get(&a), arrays.get(&b)) {
        (Some(x), Some(y)) => x.zip_with(y, f),
        _ => return,
    };
    debug!("Computed '{target}' from '{a}' and '{b}'");
    arrays.insert(target, values);
}
