//! CSV loading for feature tables
//!
//! The first row holds column names; every column must be numeric. One
//! column is taken as the regression target, the rest become features in
//! file order.

use crate::error::{Error, Result};
use crate::table::{FeatureTable, TabularDataset};
use ndarray::{Array1, Array2};
use std::io::Read;
use std::path::Path;

/// Read a CSV file into a [`TabularDataset`], using `target` as the target column.
pub fn read_csv_table<P: AsRef<Path>>(path: P, target: &str) -> Result<TabularDataset> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(Error::MissingResource(path.to_path_buf()));
    }
    let file = std::fs::File::open(path)?;
    read_csv_table_from_reader(file, target)
}

/// Same as [`read_csv_table`] for any reader.
pub fn read_csv_table_from_reader<R: Read>(reader: R, target: &str) -> Result<TabularDataset> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    let target_idx = headers
        .iter()
        .position(|h| h == target)
        .ok_or_else(|| Error::invalid_parameter("target", target, "column not found in header"))?;

    let n_features = headers.len() - 1;
    let mut features = Vec::new();
    let mut targets = Vec::new();

    for record in rdr.records() {
        let record = record?;
        let line = record.position().map_or(0, |p| p.line());
        for (i, field) in record.iter().enumerate() {
            let value: f64 = field.parse().map_err(|e: std::num::ParseFloatError| Error::Parse {
                line,
                column: headers[i].clone(),
                message: e.to_string(),
            })?;
            if i == target_idx {
                targets.push(value);
            } else {
                features.push(value);
            }
        }
    }

    let n_samples = targets.len();
    let feature_names: Vec<String> = headers
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != target_idx)
        .map(|(_, h)| h.clone())
        .collect();

    let table = FeatureTable::new(
        Array2::from_shape_vec((n_samples, n_features), features)?,
        Array1::from_vec(targets),
        feature_names,
        target,
    )?;
    Ok(TabularDataset::describe(table))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUSING: &str = "\
MedInc,HouseAge,AveRooms,MedHouseVal
8.3252,41,6.98,4.526
8.3014,21,6.24,3.585
7.2574,52,8.29,3.521
";

    #[test]
    fn test_read_table() {
        let ds = read_csv_table_from_reader(HOUSING.as_bytes(), "MedHouseVal").unwrap();
        let t = &ds.table;
        assert_eq!(t.n_samples(), 3);
        assert_eq!(t.feature_names(), &["MedInc", "HouseAge", "AveRooms"]);
        assert_eq!(t.target().to_vec(), vec![4.526, 3.585, 3.521]);
        assert_eq!(t.features()[[2, 1]], 52.0);
        assert!(ds.description.contains("MedInc"));
    }

    #[test]
    fn test_target_in_middle() {
        let ds = read_csv_table_from_reader(HOUSING.as_bytes(), "HouseAge").unwrap();
        assert_eq!(ds.table.feature_names(), &["MedInc", "AveRooms", "MedHouseVal"]);
        assert_eq!(ds.table.target().to_vec(), vec![41.0, 21.0, 52.0]);
    }

    #[test]
    fn test_missing_target() {
        let r = read_csv_table_from_reader(HOUSING.as_bytes(), "Price");
        assert!(matches!(r, Err(Error::InvalidParameter { .. })));
    }

    #[test]
    fn test_non_numeric_cell() {
        let data = "a,y\n1.0,2.0\nfoo,3.0\n";
        let r = read_csv_table_from_reader(data.as_bytes(), "y");
        match r {
            Err(Error::Parse { line, column, .. }) => {
                assert_eq!(line, 3);
                assert_eq!(column, "a");
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_ragged_rows() {
        let data = "a,y\n1.0,2.0\n3.0\n";
        assert!(matches!(
            read_csv_table_from_reader(data.as_bytes(), "y"),
            Err(Error::Csv(_))
        ));
    }
}
