//! Filesystem artifact store.
//!
//! Two files per uppercased ticker under the models directory:
//! `{TICKER}_model.json` and `{TICKER}_scaler.json`. Both are written to
//! temporary files first and renamed into place, scaler before model, so a
//! visible model file always has its matching scaler.

use crate::domain::ports::{ModelStore, StoredArtifact};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct FsModelStore {
    dir: PathBuf,
}

impl FsModelStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create model directory {:?}", dir))?;
        Ok(Self { dir })
    }

    fn model_path(&self, ticker: &str) -> PathBuf {
        self.dir.join(format!("{}_model.json", ticker))
    }

    fn scaler_path(&self, ticker: &str) -> PathBuf {
        self.dir.join(format!("{}_scaler.json", ticker))
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes).with_context(|| format!("Failed to write {:?}", tmp))?;
    fs::rename(&tmp, path).with_context(|| format!("Failed to rename {:?} into place", tmp))?;
    Ok(())
}

impl ModelStore for FsModelStore {
    fn exists(&self, ticker: &str) -> bool {
        self.model_path(ticker).exists() && self.scaler_path(ticker).exists()
    }

    fn put(&self, ticker: &str, model: &[u8], scaler: &[u8]) -> Result<()> {
        // Scaler first: the artifact only becomes visible once the model
        // file lands, and by then its scaler is already on disk.
        write_atomic(&self.scaler_path(ticker), scaler)?;
        write_atomic(&self.model_path(ticker), model)?;
        debug!(ticker, dir = ?self.dir, "Artifact persisted");
        Ok(())
    }

    fn get(&self, ticker: &str) -> Result<Option<StoredArtifact>> {
        let model_path = self.model_path(ticker);
        let scaler_path = self.scaler_path(ticker);
        if !model_path.exists() || !scaler_path.exists() {
            return Ok(None);
        }
        let model =
            fs::read(&model_path).with_context(|| format!("Failed to read {:?}", model_path))?;
        let scaler =
            fs::read(&scaler_path).with_context(|| format!("Failed to read {:?}", scaler_path))?;
        Ok(Some(StoredArtifact { model, scaler }))
    }

    fn delete(&self, ticker: &str) -> Result<()> {
        // Model first so no reader sees a model without a scaler mid-delete.
        for path in [self.model_path(ticker), self.scaler_path(ticker)] {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(anyhow::Error::from(e)
                        .context(format!("Failed to remove {:?}", path)))
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn put_get_round_trip() {
        let dir = tempdir().unwrap();
        let store = FsModelStore::new(dir.path()).unwrap();

        assert!(!store.exists("AAPL"));
        store.put("AAPL", b"model-bytes", b"scaler-bytes").unwrap();
        assert!(store.exists("AAPL"));

        let artifact = store.get("AAPL").unwrap().unwrap();
        assert_eq!(artifact.model, b"model-bytes");
        assert_eq!(artifact.scaler, b"scaler-bytes");
    }

    #[test]
    fn exists_requires_both_files() {
        let dir = tempdir().unwrap();
        let store = FsModelStore::new(dir.path()).unwrap();
        store.put("MSFT", b"m", b"s").unwrap();

        fs::remove_file(dir.path().join("MSFT_scaler.json")).unwrap();
        assert!(!store.exists("MSFT"));
        assert!(store.get("MSFT").unwrap().is_none());
    }

    #[test]
    fn delete_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = FsModelStore::new(dir.path()).unwrap();
        store.put("GOOG", b"m", b"s").unwrap();

        store.delete("GOOG").unwrap();
        assert!(!store.exists("GOOG"));
        // second delete of an absent ticker succeeds silently
        store.delete("GOOG").unwrap();
        store.delete("NEVER_TRAINED").unwrap();
    }

    #[test]
    fn tickers_do_not_collide() {
        let dir = tempdir().unwrap();
        let store = FsModelStore::new(dir.path()).unwrap();
        store.put("A", b"model-a", b"scaler-a").unwrap();
        store.put("AA", b"model-aa", b"scaler-aa").unwrap();

        assert_eq!(store.get("A").unwrap().unwrap().model, b"model-a");
        assert_eq!(store.get("AA").unwrap().unwrap().model, b"model-aa");
    }
}
