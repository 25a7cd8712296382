//! Match the small formula language XDI uses to describe derived columns.
//!
//! Fields such as `Mu_transmission: -ln($3/$2)` or `Abscissa: $1` describe how an
//! array can be computed from the columns of the data block. Only a restricted
//! shape is accepted:
//!
//! ```text
//! [-] ln ( $N OP $M )      OP is "/" or "*"
//! [-] ( $N [OP $M] )
//! [-] $N [OP $M]
//! ```
//!
//! Column references are 1-based. Parsing returns a [`MathExpr`] that keeps the sign,
//! function, and operands apart so callers can decide which columns feed which
//! quantity:
//!
//! ```
//! use xdiformat::math_expr::{MathExpr, Func, Op, Sign};
//! let e = MathExpr::parse("-ln($3/$2)").unwrap();
//! assert_eq!(e.sign, Sign::Negative);
//! assert_eq!(e.func, Func::Ln);
//! assert_eq!(e.left, 3);
//! assert_eq!(e.rhs(), Some((Op::Div, 2)));
//! assert_eq!(e.to_string(), "-ln($3/$2)");
//! ```
use std::fmt::Display;

use pest::{iterators::Pair, Parser};

use crate::validators::{Rule, XdiParser};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Positive,
    Negative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Func {
    /// No function applied, e.g. `$4/$2`
    Identity,
    /// Natural logarithm, e.g. `ln($2/$3)`
    Ln,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Div,
    Mul,
}

impl Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Op::Div => write!(f, "/"),
            Op::Mul => write!(f, "*"),
        }
    }
}

/// A parsed formula of the form `sign func(left op right)`.
///
/// `right` and `op` are absent for single-column formulas like `$1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MathExpr {
    pub sign: Sign,
    pub func: Func,
    /// 1-based index of the first column reference
    pub left: usize,
    pub op: Option<Op>,
    /// 1-based index of the second column reference, if any
    pub right: Option<usize>,
}

impl MathExpr {
    /// Match `s` against the formula grammar. Returns `None` if it does not match.
    pub fn parse(s: &str) -> Option<Self> {
        let tree = XdiParser::parse(Rule::formula, s).ok()?.next()?;
        let expr = tree.into_inner().find(|p| p.as_rule() == Rule::expr)?;

        let mut sign = Sign::Positive;
        let mut func = Func::Identity;
        let mut operands = None;

        let mut stack: Vec<_> = expr.into_inner().rev().collect();
        while let Some(pair) = stack.pop() {
            match pair.as_rule() {
                Rule::sign => sign = Sign::Negative,
                Rule::func => func = Func::Ln,
                Rule::call | Rule::group => {
                    for inner in pair.into_inner().rev() {
                        stack.push(inner);
                    }
                }
                Rule::operation => operands = Some(operation_from_pair(pair)?),
                _ => return None,
            }
        }

        let (left, rhs) = operands?;
        Some(Self {
            sign,
            func,
            left,
            op: rhs.map(|(op, _)| op),
            right: rhs.map(|(_, r)| r),
        })
    }

    /// Formula for a single column, i.e. `$N`
    pub fn column(index: usize) -> Self {
        Self { sign: Sign::Positive, func: Func::Identity, left: index, op: None, right: None }
    }

    /// Formula `-ln($numerator/$denominator)`
    pub fn neg_log_ratio(numerator: usize, denominator: usize) -> Self {
        Self {
            sign: Sign::Negative,
            func: Func::Ln,
            left: numerator,
            op: Some(Op::Div),
            right: Some(denominator),
        }
    }

    /// Formula `$numerator/$denominator`
    pub fn ratio(numerator: usize, denominator: usize) -> Self {
        Self {
            sign: Sign::Positive,
            func: Func::Identity,
            left: numerator,
            op: Some(Op::Div),
            right: Some(denominator),
        }
    }

    /// The operator and right-hand column, if the formula has two operands.
    pub fn rhs(&self) -> Option<(Op, usize)> {
        self.op.zip(self.right)
    }

    /// All referenced columns, in order of appearance.
    pub fn columns(&self) -> Vec<usize> {
        let mut cols = vec![self.left];
        cols.extend(self.right);
        cols
    }
}

impl Display for MathExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if let Sign::Negative = self.sign { "-" } else { "" };
        let body = if let Some((op, right)) = self.rhs() {
            format!("${}{op}${right}", self.left)
        } else {
            format!("${}", self.left)
        };

        match self.func {
            Func::Ln => write!(f, "{sign}ln({body})"),
            Func::Identity if sign.is_empty() => write!(f, "{body}"),
            Func::Identity => write!(f, "{sign}({body})"),
        }
    }
}

fn operation_from_pair(pair: Pair<Rule>) -> Option<(usize, Option<(Op, usize)>)> {
    let mut inner = pair.into_inner();
    let left = colref_index(inner.next()?)?;
    let rhs = match inner.next() {
        Some(op_pair) => {
            let op = match op_pair.as_str() {
                "/" => Op::Div,
                "*" => Op::Mul,
                _ => return None,
            };
            let right = colref_index(inner.next()?)?;
            Some((op, right))
        }
        None => None,
    };
    Some((left, rhs))
}

fn colref_index(pair: Pair<Rule>) -> Option<usize> {
    // The grammar only allows digits here, but the number may still overflow
    let index = pair.into_inner().next()?;
    index.as_str().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_ratio() {
        let e = MathExpr::parse("ln($2/$3)").unwrap();
        let expected = MathExpr {
            sign: Sign::Positive,
            func: Func::Ln,
            left: 2,
            op: Some(Op::Div),
            right: Some(3),
        };
        assert_eq!(e, expected);

        let e = MathExpr::parse("-LN( $3 / $2 )").unwrap();
        assert_eq!(
            e,
            MathExpr::neg_log_ratio(3, 2),
            "Parsing with whitespace and upper case 'LN' failed"
        );

        let e = MathExpr::parse("-ln($10*$11)").unwrap();
        assert_eq!(e.rhs(), Some((Op::Mul, 11)));
        assert_eq!(e.left, 10);
    }

    #[test]
    fn test_plain_forms() {
        assert_eq!(MathExpr::parse("$1"), Some(MathExpr::column(1)));
        assert_eq!(MathExpr::parse("$4/$2"), Some(MathExpr::ratio(4, 2)));
        assert_eq!(MathExpr::parse("($4/$2)"), Some(MathExpr::ratio(4, 2)));

        let e = MathExpr::parse("-($5)").unwrap();
        assert_eq!(e.sign, Sign::Negative);
        assert_eq!(e.columns(), vec![5]);
    }

    #[test]
    fn test_rejects() {
        for bad in ["", "$0", "ln$2/$3", "log($2/$3)", "$3*exp(-$2)", "$a/$b", "ln($2/$3", "$2/$3/$4", "--$1", "2/3"] {
            assert!(MathExpr::parse(bad).is_none(), "'{bad}' should not match");
        }
    }

    #[test]
    fn test_display() {
        for s in ["-ln($3/$2)", "ln($2/$3)", "$4/$2", "$1", "-($5)", "ln($2*$3)"] {
            let e = MathExpr::parse(s).unwrap();
            assert_eq!(e.to_string(), s);
            let back = MathExpr::parse(&e.to_string());
            assert_eq!(back, Some(e), "Display output of '{s}' did not parse back");
        }
    }
}
