//! # Sample sets
//!
//! Simulated steady-state readouts for the two ligand classes.
//!
//! Input files are flat numeric text: one value per line, or whitespace
//! separated rows. Every token becomes one sample, in file order. Lines
//! starting with `#` are skipped, as `numpy.loadtxt` does.
//!
//! A simulation directory may also carry a `column_names` file (a single line
//! of space separated species names, sometimes under `sample_0/`) and a
//! `Ligand_concentrations` file with the ligand draw behind each trial. Both
//! only feed labels and summary statistics; the capacity never looks at them.
//!
//! # Examples
//!
//! ```rust
//! use chancap::{Class, SampleStore};
//!
//! let store = SampleStore::new(vec![1.0, 2.0, 3.0], vec![10.0, 20.0]);
//! assert_eq!(store.mean(Class::Foreign).unwrap(), 2.0);
//! assert_eq!(store.mean(Class::SelfLigand).unwrap(), 15.0);
//! assert_eq!(store.label(Class::Foreign), "P(foreign)");
//! ```

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::{Class, Error, Result};

/// Readout file inside a simulation directory.
pub const OUTPUT_FILE: &str = "output";
/// Per-trial ligand concentration draws.
pub const LIGAND_FILE: &str = "Ligand_concentrations";
/// Optional single-line species labels.
pub const COLUMN_NAMES_FILE: &str = "column_names";

/// Loaded samples for both classes. Never mutated after construction.
#[derive(Debug, Clone, Default)]
pub struct SampleStore {
    foreign: Vec<f64>,
    self_: Vec<f64>,
    foreign_ligand: Option<Vec<f64>>,
    self_ligand: Option<Vec<f64>>,
    foreign_columns: Option<Vec<String>>,
    self_columns: Option<Vec<String>>,
}

impl SampleStore {
    /// Build a store from in-memory samples.
    pub fn new(foreign: Vec<f64>, self_: Vec<f64>) -> Self {
        Self {
            foreign,
            self_,
            ..Self::default()
        }
    }

    /// Load two flat numeric files.
    ///
    /// Empty files are accepted here; the estimator rejects empty sets later.
    pub fn load(foreign_path: impl AsRef<Path>, self_path: impl AsRef<Path>) -> Result<Self> {
        let foreign = read_numbers(foreign_path.as_ref())?;
        let self_ = read_numbers(self_path.as_ref())?;
        tracing::info!(
            foreign = foreign.len(),
            self_ = self_.len(),
            "loaded sample sets"
        );
        Ok(Self::new(foreign, self_))
    }

    /// Load `output` from two simulation directories, plus the optional
    /// ligand concentrations and column names found next to it.
    pub fn from_directories(
        foreign_dir: impl AsRef<Path>,
        self_dir: impl AsRef<Path>,
    ) -> Result<Self> {
        let (foreign_dir, self_dir) = (foreign_dir.as_ref(), self_dir.as_ref());
        let mut store = Self::load(foreign_dir.join(OUTPUT_FILE), self_dir.join(OUTPUT_FILE))?;

        store.foreign_ligand = read_optional_numbers(&foreign_dir.join(LIGAND_FILE))?;
        store.self_ligand = read_optional_numbers(&self_dir.join(LIGAND_FILE))?;
        store.foreign_columns = read_column_names(foreign_dir)?;
        store.self_columns = read_column_names(self_dir)?;

        if store.foreign_columns.is_some() {
            tracing::debug!(dir = %foreign_dir.display(), "loaded foreign column names");
        }
        Ok(store)
    }

    pub fn samples(&self, which: Class) -> &[f64] {
        match which {
            Class::Foreign => &self.foreign,
            Class::SelfLigand => &self.self_,
        }
    }

    pub fn foreign(&self) -> &[f64] {
        &self.foreign
    }

    pub fn self_samples(&self) -> &[f64] {
        &self.self_
    }

    pub fn len(&self, which: Class) -> usize {
        self.samples(which).len()
    }

    /// Arithmetic mean of one class's readouts.
    pub fn mean(&self, which: Class) -> Result<f64> {
        mean(self.samples(which)).ok_or(Error::EmptySampleSet(which))
    }

    /// Mean ligand concentration behind one class's trials.
    ///
    /// Fails with [`Error::EmptySampleSet`] when no concentrations were loaded.
    pub fn ligand_mean(&self, which: Class) -> Result<f64> {
        let ligand = match which {
            Class::Foreign => self.foreign_ligand.as_deref(),
            Class::SelfLigand => self.self_ligand.as_deref(),
        };
        ligand
            .and_then(mean)
            .ok_or(Error::EmptySampleSet(which))
    }

    pub fn column_names(&self, which: Class) -> Option<&[String]> {
        match which {
            Class::Foreign => self.foreign_columns.as_deref(),
            Class::SelfLigand => self.self_columns.as_deref(),
        }
    }

    /// Presentation label for one class's readout, e.g. `P(Cn)`.
    ///
    /// The readout is the last column. When the last two foreign columns are
    /// the two ligand-bound species (`Lf` and `Ls`), the readout is their sum.
    pub fn label(&self, which: Class) -> String {
        let Some(cols) = self.column_names(which).filter(|c| !c.is_empty()) else {
            return format!("P({which})");
        };
        let last = &cols[cols.len() - 1];
        if which == Class::Foreign && cols.len() > 1 {
            let prev = &cols[cols.len() - 2];
            let names_lf = prev.contains("Lf") || last.contains("Lf");
            let names_ls = prev.contains("Ls") || last.contains("Ls");
            if names_lf && names_ls {
                return format!("P({prev} + {last})");
            }
        }
        format!("P({last})")
    }
}

fn mean(xs: &[f64]) -> Option<f64> {
    if xs.is_empty() {
        return None;
    }
    Some(xs.iter().sum::<f64>() / xs.len() as f64)
}

fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => Error::InputNotFound {
            path: path.to_path_buf(),
        },
        _ => Error::Io {
            path: path.to_path_buf(),
            source,
        },
    })
}

/// Parse whitespace separated floats.
pub fn parse_numbers(text: &str, path: &Path) -> Result<Vec<f64>> {
    let mut out = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        for token in line.split_whitespace() {
            let v = token.parse::<f64>().map_err(|_| Error::Parse {
                path: path.to_path_buf(),
                line: i + 1,
                token: token.to_string(),
            })?;
            out.push(v);
        }
    }
    Ok(out)
}

/// Read a file of whitespace separated floats.
pub fn read_numbers(path: &Path) -> Result<Vec<f64>> {
    parse_numbers(&read_to_string(path)?, path)
}

fn read_optional_numbers(path: &Path) -> Result<Option<Vec<f64>>> {
    if !path.exists() {
        return Ok(None);
    }
    read_numbers(path).map(Some)
}

fn column_names_path(dir: &Path) -> Option<PathBuf> {
    [
        dir.join("sample_0").join(COLUMN_NAMES_FILE),
        dir.join(COLUMN_NAMES_FILE),
    ]
    .into_iter()
    .find(|p| p.exists())
}

fn read_column_names(dir: &Path) -> Result<Option<Vec<String>>> {
    let Some(path) = column_names_path(dir) else {
        return Ok(None);
    };
    let text = read_to_string(&path)?;
    let first = text.lines().next().unwrap_or("");
    Ok(Some(first.split_whitespace().map(str::to_string).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let p = dir.join(name);
        if let Some(parent) = p.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&p, contents).unwrap();
        p
    }

    #[test]
    fn parses_lines_and_rows() {
        let xs = parse_numbers("1.0\n2.5 3\n\n# comment\n-4e2\n", Path::new("x")).unwrap();
        assert_eq!(xs, vec![1.0, 2.5, 3.0, -400.0]);
    }

    #[test]
    fn parse_error_reports_line_and_token() {
        let err = parse_numbers("1.0\n2.0\nabc\n", Path::new("f")).unwrap_err();
        match err {
            Error::Parse { line, token, .. } => {
                assert_eq!(line, 3);
                assert_eq!(token, "abc");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_file_is_input_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let ok = write(dir.path(), "self", "1\n");
        let err = SampleStore::load(dir.path().join("nope"), &ok).unwrap_err();
        assert!(matches!(err, Error::InputNotFound { .. }));
    }

    #[test]
    fn empty_file_loads_but_mean_fails() {
        let dir = tempfile::tempdir().unwrap();
        let f = write(dir.path(), "foreign", "");
        let s = write(dir.path(), "self", "2\n4\n");
        let store = SampleStore::load(&f, &s).unwrap();
        assert_eq!(store.len(Class::Foreign), 0);
        assert!(matches!(
            store.mean(Class::Foreign),
            Err(Error::EmptySampleSet(Class::Foreign))
        ));
        assert_eq!(store.mean(Class::SelfLigand).unwrap(), 3.0);
    }

    #[test]
    fn directories_pick_up_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let fd = dir.path().join("Ls_Lf_30");
        let sd = dir.path().join("Ls");
        write(&fd, "output", "1\n2\n3\n");
        write(&fd, "Ligand_concentrations", "30\n30\n30\n");
        write(&fd, "sample_0/column_names", "R C0 C1_Lf D1_Ls\n");
        write(&sd, "output", "0.5\n0.5\n");
        write(&sd, "column_names", "R D0 D1\n");

        let store = SampleStore::from_directories(&fd, &sd).unwrap();
        assert_eq!(store.samples(Class::Foreign), &[1.0, 2.0, 3.0]);
        assert_eq!(store.ligand_mean(Class::Foreign).unwrap(), 30.0);
        assert!(store.ligand_mean(Class::SelfLigand).is_err());
        assert_eq!(store.label(Class::Foreign), "P(C1_Lf + D1_Ls)");
        assert_eq!(store.label(Class::SelfLigand), "P(D1)");
    }

    #[test]
    fn labels_fall_back_without_column_names() {
        let store = SampleStore::new(vec![1.0], vec![2.0]);
        assert_eq!(store.label(Class::SelfLigand), "P(self)");
        assert!(store.column_names(Class::Foreign).is_none());
    }
}
