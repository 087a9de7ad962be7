//! Columnar array store for landmark and feature matrices.
//!
//! A store holds three parallel arrays: an N×63 `f32` matrix (row-major),
//! N labels and N source identifiers. The same layout is used for raw
//! skeletons straight out of the detector and for normalized features.
//!
//! Files are bincode-encoded and written atomically: the record goes to a
//! temporary file next to the destination which is then renamed over it.

use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::{Error, Result};
use crate::types::FEATURE_DIM;

/// On-disk format version.
pub const STORE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayStore {
    version: u32,
    rows: usize,
    cols: usize,
    features: Vec<f32>,
    labels: Vec<String>,
    kept_paths: Vec<String>,
}

impl ArrayStore {
    /// Assemble a store from a flat row-major matrix and its parallel columns.
    pub fn new(features: Vec<f32>, labels: Vec<String>, kept_paths: Vec<String>) -> Result<Self> {
        let rows = labels.len();
        let store = Self {
            version: STORE_VERSION,
            rows,
            cols: FEATURE_DIM,
            features,
            labels,
            kept_paths,
        };
        store.check_shape().map_err(|(what, expected, found)| Error::ShapeMismatch {
            what,
            expected,
            found,
        })?;
        Ok(store)
    }

    pub fn empty() -> Self {
        Self {
            version: STORE_VERSION,
            rows: 0,
            cols: FEATURE_DIM,
            features: Vec::new(),
            labels: Vec::new(),
            kept_paths: Vec::new(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn features(&self) -> &[f32] {
        &self.features
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn kept_paths(&self) -> &[String] {
        &self.kept_paths
    }

    /// The `idx`-th row of the matrix.
    pub fn row(&self, idx: usize) -> &[f32] {
        &self.features[idx * self.cols..(idx + 1) * self.cols]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = (&[f32], &str, &str)> + '_ {
        self.features
            .chunks_exact(self.cols)
            .zip(self.labels.iter())
            .zip(self.kept_paths.iter())
            .map(|((row, label), path)| (row, label.as_str(), path.as_str()))
    }

    /// Load a store written by [`ArrayStore::save`].
    ///
    /// A missing file is reported as [`Error::FeatureStoreNotFound`]; anything
    /// that does not decode into a consistent N×63 record is
    /// [`Error::FeatureStoreCorrupt`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::FeatureStoreNotFound(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };
        let mut reader = BufReader::new(file);
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;

        let corrupt = |detail: String| Error::FeatureStoreCorrupt {
            path: path.to_path_buf(),
            detail,
        };

        let store: Self =
            bincode::deserialize(&bytes).map_err(|e| corrupt(format!("undecodable: {}", e)))?;

        if store.version != STORE_VERSION {
            return Err(corrupt(format!(
                "expected format version {}, found {}",
                STORE_VERSION, store.version
            )));
        }
        store
            .check_shape()
            .map_err(|(what, expected, found)| {
                corrupt(format!("{}: expected {}, found {}", what, expected, found))
            })?;

        log::info!("Loaded {} rows from {}", store.rows, path.display());
        Ok(store)
    }

    /// Write the store in one shot, replacing any existing file atomically.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let bytes = bincode::serialize(self)?;
        let tmp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            writer.write_all(&bytes)?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| Error::Io(e.error))?;

        log::info!("Saved {} rows to {}", self.rows, path.display());
        Ok(())
    }

    /// Returns the first inconsistency as (what, expected, found).
    fn check_shape(&self) -> std::result::Result<(), (&'static str, usize, usize)> {
        if self.cols != FEATURE_DIM {
            return Err(("columns", FEATURE_DIM, self.cols));
        }
        match self.rows.checked_mul(self.cols) {
            Some(len) if len == self.features.len() => {}
            Some(len) => return Err(("matrix values", len, self.features.len())),
            None => return Err(("rows", self.features.len() / self.cols, self.rows)),
        }
        if self.labels.len() != self.rows {
            return Err(("labels", self.rows, self.labels.len()));
        }
        if self.kept_paths.len() != self.rows {
            return Err(("source paths", self.rows, self.kept_paths.len()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_row_store() -> ArrayStore {
        let mut features: Vec<f32> = (0..FEATURE_DIM).map(|i| i as f32 * 0.1).collect();
        features.extend((0..FEATURE_DIM).map(|i| -(i as f32) / 3.0));
        ArrayStore::new(
            features,
            vec!["Anjali".into(), "Aralam".into()],
            vec!["a.jpg".into(), "".into()],
        )
        .unwrap()
    }

    #[test]
    fn new_checks_parallel_lengths() {
        let err = ArrayStore::new(vec![0.0; FEATURE_DIM], vec!["a".into()], vec![]).unwrap_err();
        assert!(matches!(
            err,
            Error::ShapeMismatch {
                expected: 1,
                found: 0,
                ..
            }
        ));

        let err = ArrayStore::new(vec![0.0; 10], vec!["a".into()], vec!["p".into()]).unwrap_err();
        assert!(matches!(
            err,
            Error::ShapeMismatch {
                expected: 63,
                found: 10,
                ..
            }
        ));
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("features.bin");
        let store = two_row_store();

        store.save(&path).unwrap();
        let loaded = ArrayStore::load(&path).unwrap();

        assert_eq!(loaded, store);
        assert_eq!(loaded.rows(), 2);
        assert_eq!(loaded.row(1)[3].to_bits(), (-(3.0f32) / 3.0).to_bits());
    }

    #[test]
    fn save_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("features.bin");

        ArrayStore::empty().save(&path).unwrap();
        two_row_store().save(&path).unwrap();

        assert_eq!(ArrayStore::load(&path).unwrap().rows(), 2);
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.bin");
        assert!(matches!(
            ArrayStore::load(&path),
            Err(Error::FeatureStoreNotFound(p)) if p == path
        ));
    }

    #[test]
    fn garbage_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.bin");
        std::fs::write(&path, b"definitely not a store").unwrap();

        assert!(matches!(
            ArrayStore::load(&path),
            Err(Error::FeatureStoreCorrupt { .. })
        ));
    }

    #[test]
    fn mismatched_rows_are_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad_rows.bin");

        let mut store = two_row_store();
        store.kept_paths.pop();
        std::fs::write(&path, bincode::serialize(&store).unwrap()).unwrap();

        match ArrayStore::load(&path) {
            Err(Error::FeatureStoreCorrupt { detail, .. }) => {
                assert!(detail.contains("expected 2, found 1"), "{}", detail);
            }
            other => panic!("expected corrupt store, got {:?}", other),
        }
    }

    #[test]
    fn overflowing_row_count_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge_rows.bin");

        let mut store = ArrayStore::empty();
        store.rows = usize::MAX / 8;
        std::fs::write(&path, bincode::serialize(&store).unwrap()).unwrap();

        match ArrayStore::load(&path) {
            Err(Error::FeatureStoreCorrupt { detail, .. }) => {
                assert!(
                    detail.contains(&format!("expected 0, found {}", usize::MAX / 8)),
                    "{}",
                    detail
                );
            }
            other => panic!("expected corrupt store, got {:?}", other),
        }
    }
}
