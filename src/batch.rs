//! Batch evaluation over a table of simulation directories.
//!
//! The table is tab separated with a header. Its first column is a row
//! index and one column, `file_path`, names a parameter-sweep directory
//! holding one subdirectory per ligand class:
//!
//! ```text
//! 	file_path	k_on
//! 0	runs/kp_3_step	0.1
//! 1	runs/kp_4_step	0.1
//! ```
//!
//! Each row is estimated independently on the rayon pool and reported back
//! with the class means, the capacity `C`, the resolution and the status.

use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::capacity::{CapacityEstimate, CapacityEstimator};
use crate::samples::SampleStore;
use crate::{Class, Error, Result};

pub const PATH_COLUMN: &str = "file_path";

/// Where each class lives under a row's `file_path`.
#[derive(Debug, Clone)]
pub struct DirectoryLayout {
    pub foreign_subdir: PathBuf,
    pub self_subdir: PathBuf,
}

impl Default for DirectoryLayout {
    fn default() -> Self {
        Self {
            foreign_subdir: PathBuf::from("Ls_Lf_30"),
            self_subdir: PathBuf::from("Ls"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchTable {
    path: PathBuf,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    path_column: usize,
}

impl BatchTable {
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(Error::InputNotFound { path });
        }
        let table_err = |source| Error::Table {
            path: path.clone(),
            source,
        };

        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .flexible(false)
            .from_path(&path)
            .map_err(table_err)?;
        let headers: Vec<String> = rdr
            .headers()
            .map_err(table_err)?
            .iter()
            .map(str::to_string)
            .collect();
        let path_column = headers
            .iter()
            .position(|h| h == PATH_COLUMN)
            .ok_or_else(|| Error::MissingColumn {
                path: path.clone(),
                column: PATH_COLUMN.to_string(),
            })?;

        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record.map_err(table_err)?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(Self {
            path,
            headers,
            rows,
            path_column,
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The row's `file_path`, relative paths resolved against the table's directory.
    pub fn row_dir(&self, row: usize) -> PathBuf {
        let p = PathBuf::from(&self.rows[row][self.path_column]);
        if p.is_absolute() {
            return p;
        }
        match self.path.parent() {
            Some(base) => base.join(p),
            None => p,
        }
    }
}

/// One evaluated row.
#[derive(Debug, Clone)]
pub struct BatchRecord {
    pub row: usize,
    pub foreign_mean: f64,
    pub self_mean: f64,
    pub estimate: CapacityEstimate,
}

/// Estimate every row in parallel. A row that fails to load aborts the batch.
pub fn run_batch(
    table: &BatchTable,
    layout: &DirectoryLayout,
    estimator: &CapacityEstimator,
) -> Result<Vec<BatchRecord>> {
    (0..table.len())
        .into_par_iter()
        .map(|row| -> Result<BatchRecord> {
            let dir = table.row_dir(row);
            let store = SampleStore::from_directories(
                dir.join(&layout.foreign_subdir),
                dir.join(&layout.self_subdir),
            )?;
            let estimate = estimator.estimate(&store)?;
            if !estimate.converged() {
                tracing::warn!(row, dir = %dir.display(), "row did not converge");
            }
            Ok(BatchRecord {
                row,
                foreign_mean: store.mean(Class::Foreign)?,
                self_mean: store.mean(Class::SelfLigand)?,
                estimate,
            })
        })
        .collect()
}

/// Write the table back out with `ls_mean`, `lf_mean`, `C`, `resolution`
/// and `status` appended. Floats use three decimals.
pub fn write_report(path: &Path, table: &BatchTable, records: &[BatchRecord]) -> Result<()> {
    let table_err = |source| Error::Table {
        path: path.to_path_buf(),
        source,
    };
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)
        .map_err(table_err)?;

    let mut header: Vec<&str> = table.headers.iter().map(String::as_str).collect();
    header.extend(["ls_mean", "lf_mean", "C", "resolution", "status"]);
    wtr.write_record(&header).map_err(table_err)?;

    for rec in records {
        let mut fields = table.rows[rec.row].clone();
        fields.push(format!("{:.3}", rec.self_mean));
        fields.push(format!("{:.3}", rec.foreign_mean));
        fields.push(format!("{:.3}", rec.estimate.capacity));
        fields.push(rec.estimate.resolution.to_string());
        fields.push(rec.estimate.status.as_str().to_string());
        wtr.write_record(&fields).map_err(table_err)?;
    }
    wtr.flush().map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capacity::Status;
    use crate::config::EstimatorConfig;
    use std::fs;

    fn write_class(dir: &Path, values: &[f64]) {
        fs::create_dir_all(dir).unwrap();
        let text: String = values.iter().map(|v| format!("{v}\n")).collect();
        fs::write(dir.join("output"), text).unwrap();
    }

    #[test]
    fn runs_every_row_and_writes_report() {
        let root = tempfile::tempdir().unwrap();
        let near: Vec<f64> = (0..400).map(|i| (i % 40) as f64 * 0.1).collect();
        let far: Vec<f64> = near.iter().map(|x| x + 50.0).collect();

        write_class(&root.path().join("a/Ls_Lf_30"), &near);
        write_class(&root.path().join("a/Ls"), &far);
        write_class(&root.path().join("b/Ls_Lf_30"), &near);
        write_class(&root.path().join("b/Ls"), &near);

        let table_path = root.path().join("file_paths");
        fs::write(&table_path, "\tfile_path\tk\n0\ta\t1.0\n1\tb\t2.0\n").unwrap();

        let table = BatchTable::read(&table_path).unwrap();
        assert_eq!(table.len(), 2);
        let est = CapacityEstimator::new(EstimatorConfig::default()).unwrap();
        let mut records = run_batch(&table, &DirectoryLayout::default(), &est).unwrap();
        records.sort_by_key(|r| r.row);

        assert_eq!(records[0].estimate.status, Status::Degenerate);
        assert_eq!(records[0].estimate.capacity, 1.0);
        assert!(records[1].estimate.capacity < 1e-9);
        assert!((records[0].self_mean - records[0].foreign_mean - 50.0).abs() < 1e-9);

        let out = root.path().join("output_info");
        write_report(&out, &table, &records).unwrap();
        let text = fs::read_to_string(&out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "\tfile_path\tk\tls_mean\tlf_mean\tC\tresolution\tstatus"
        );
        assert!(lines.next().unwrap().contains("\t1.000\t50\tdegenerate"));
    }

    #[test]
    fn missing_path_column_is_reported() {
        let root = tempfile::tempdir().unwrap();
        let table_path = root.path().join("file_paths");
        fs::write(&table_path, "\tdir\n0\ta\n").unwrap();
        let err = BatchTable::read(&table_path).unwrap_err();
        assert!(matches!(err, Error::MissingColumn { .. }));
    }

    #[test]
    fn missing_row_directory_aborts() {
        let root = tempfile::tempdir().unwrap();
        let table_path = root.path().join("file_paths");
        fs::write(&table_path, "\tfile_path\n0\tnowhere\n").unwrap();
        let table = BatchTable::read(&table_path).unwrap();
        let est = CapacityEstimator::default();
        let err = run_batch(&table, &DirectoryLayout::default(), &est).unwrap_err();
        assert!(matches!(err, Error::InputNotFound { .. }));
    }
}
