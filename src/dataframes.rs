//! Export XDI data as a polars `DataFrame`.
use polars::prelude::{DataFrame, NamedFrom, PolarsResult, Series};

use crate::document::XdiDocument;

impl XdiDocument {
    /// The data block as a dataframe, with one column per column label.
    ///
    /// Fails if two labels are the same, since dataframe column names must be unique.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let series: Vec<Series> = self
            .column_labels
            .iter()
            .enumerate()
            .map(|(i, label)| {
                let values: Vec<f64> = self
                    .raw_matrix
                    .iter()
                    .map(|row| row.get(i).copied().unwrap_or(f64::NAN))
                    .collect();
                Series::new(label, values)
            })
            .collect();
        DataFrame::new(series)
    }

    /// The semantic arrays (see [`XdiDocument::get_array`]) as a dataframe, named by
    /// their column vocabulary names and in vocabulary order.
    ///
    /// Arrays that could not be resolved are left out.
    pub fn derived_dataframe(&self) -> PolarsResult<DataFrame> {
        let series: Vec<Series> = self
            .derived_arrays
            .iter()
            .map(|(name, array)| Series::new(name.as_str(), array.as_slice()))
            .collect();
        DataFrame::new(series)
    }
}

#[cfg(test)]
mod tests {
    use std::io::BufReader;

    use stringreader::StringReader;

    use crate::reader::ReadSettings;
    use super::*;

    const TABLE: &str = "# XDI/1.0
# Column.1: energy
# Column.2: i0
# Column.3: itrans
# ----
# energy i0 itrans
7100.0 2.0 1.0
7101.0 4.0 1.0
";

    fn read() -> Result<XdiDocument, Box<dyn std::error::Error>> {
        let table = BufReader::new(StringReader::new(TABLE));
        Ok(XdiDocument::from_reader(table, &ReadSettings::default())?)
    }

    #[test]
    fn test_to_dataframe() -> Result<(), Box<dyn std::error::Error>> {
        let df = read()?.to_dataframe()?;
        assert_eq!(df.shape(), (2, 3));
        assert_eq!(df.get_column_names(), &["energy", "i0", "itrans"]);

        let expected = Series::new("i0", &[2.0, 4.0]);
        assert_eq!(df.column("i0")?, &expected);
        Ok(())
    }

    #[test]
    fn test_derived_dataframe() -> Result<(), Box<dyn std::error::Error>> {
        let df = read()?.derived_dataframe()?;
        assert_eq!(df.get_column_names(), &["energy", "i0", "itrans", "mutrans"]);

        let mu = df.column("mutrans")?.f64()?;
        assert_eq!(mu.get(0), Some(-(0.5f64).ln()));
        assert_eq!(mu.get(1), Some(-(0.25f64).ln()));
        Ok(())
    }

    #[test]
    fn test_duplicate_labels() -> Result<(), Box<dyn std::error::Error>> {
        let doc: XdiDocument = "# XDI/1.0\n# ---\n# a a\n1 2\n".parse()?;
        assert!(doc.to_dataframe().is_err());
        Ok(())
    }
}
