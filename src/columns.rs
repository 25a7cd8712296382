//! The fixed vocabulary of semantic column names an XDI file can declare.
use std::fmt::Display;
use std::str::FromStr;

/// A semantic name for a column of the data block.
///
/// The variants are declared in the order the writer emits `Column_*` lines, and
/// `Ord` follows that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ColumnName {
    Energy,
    Angle,
    K,
    Chi,
    I0,
    Time,
    ITrans,
    IFluor,
    IRefer,
    MuTrans,
    MuFluor,
    MuRefer,
    NormTrans,
    NormFluor,
    NormRefer,
}

impl ColumnName {
    /// Every name in the vocabulary, in canonical order.
    pub const ALL: [ColumnName; 15] = [
        Self::Energy,
        Self::Angle,
        Self::K,
        Self::Chi,
        Self::I0,
        Self::Time,
        Self::ITrans,
        Self::IFluor,
        Self::IRefer,
        Self::MuTrans,
        Self::MuFluor,
        Self::MuRefer,
        Self::NormTrans,
        Self::NormFluor,
        Self::NormRefer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Energy => "energy",
            Self::Angle => "angle",
            Self::K => "k",
            Self::Chi => "chi",
            Self::I0 => "i0",
            Self::Time => "time",
            Self::ITrans => "itrans",
            Self::IFluor => "ifluor",
            Self::IRefer => "irefer",
            Self::MuTrans => "mutrans",
            Self::MuFluor => "mufluor",
            Self::MuRefer => "murefer",
            Self::NormTrans => "normtrans",
            Self::NormFluor => "normfluor",
            Self::NormRefer => "normrefer",
        }
    }
}

impl Display for ColumnName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when a string is not in the semantic column vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownColumn(pub String);

impl Display for UnknownColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "'{}' is not a recognized column name", self.0)
    }
}

impl std::error::Error for UnknownColumn {}

impl FromStr for ColumnName {
    type Err = UnknownColumn;

    /// Case-insensitive lookup of a column name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Self::ALL
            .iter()
            .find(|c| c.as_str() == lower)
            .copied()
            .ok_or_else(|| UnknownColumn(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for c in ColumnName::ALL {
            assert_eq!(c.as_str().parse::<ColumnName>(), Ok(c));
        }
    }

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!("ITrans".parse::<ColumnName>(), Ok(ColumnName::ITrans));
        assert_eq!("I0".parse::<ColumnName>(), Ok(ColumnName::I0));
        assert!("pre_edge".parse::<ColumnName>().is_err());
    }

    #[test]
    fn test_order_matches_all() {
        let mut sorted = ColumnName::ALL;
        sorted.sort();
        assert_eq!(sorted, ColumnName::ALL);
    }
}
