use std::{
    fs, io,
    path::{Path, PathBuf},
};

use log::{error, info, warn};
use machine_learning::{arch::TrainedModel, scaler::MinMaxScaler};
use parking_lot::Mutex;
use serde::{Serialize, de::DeserializeOwned};

use super::{ArtifactError, ArtifactSet};

pub const MODEL_FILE: &str = "model.json";
pub const SCALER_FILE: &str = "scaler.json";
pub const BEST_MODEL_FILE: &str = "best_model.json";
pub const BEST_SCALER_FILE: &str = "best_scaler.json";
pub const BEST_LOSS_FILE: &str = "best_test_loss.txt";

/// Where the current artifacts of a run were written.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub scaler: PathBuf,
}

/// What `persist` did.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistOutcome {
    pub paths: ArtifactPaths,
    /// Whether the run also became the best checkpoint.
    pub is_best: bool,
}

/// The best checkpoint on disk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BestModelInfo {
    pub model_path: PathBuf,
    pub test_loss: f64,
}

/// The persisted artifact layout: the artifacts of the last completed run plus the best
/// checkpoint seen so far, all as files inside one directory.
#[derive(Debug)]
pub struct ArtifactRepository {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl ArtifactRepository {
    /// Creates a new `ArtifactRepository` over `dir`, which gets created on the first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn model_path(&self) -> PathBuf {
        self.dir.join(MODEL_FILE)
    }

    pub fn scaler_path(&self) -> PathBuf {
        self.dir.join(SCALER_FILE)
    }

    pub fn best_model_path(&self) -> PathBuf {
        self.dir.join(BEST_MODEL_FILE)
    }

    pub fn best_scaler_path(&self) -> PathBuf {
        self.dir.join(BEST_SCALER_FILE)
    }

    pub fn best_loss_path(&self) -> PathBuf {
        self.dir.join(BEST_LOSS_FILE)
    }

    /// Writes `set` as the current artifacts, unconditionally, and as the best checkpoint if
    /// `test_loss` is strictly lower than the recorded best one.
    ///
    /// # Arguments
    /// * `set` - The artifacts of a finished run.
    /// * `test_loss` - The held-out loss of that run.
    ///
    /// # Returns
    /// The written paths and whether the run became the best checkpoint.
    pub fn persist(
        &self,
        set: &ArtifactSet,
        test_loss: f64,
    ) -> Result<PersistOutcome, ArtifactError> {
        let _guard = self.lock.lock();

        fs::create_dir_all(&self.dir).map_err(|source| ArtifactError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let paths = ArtifactPaths {
            model: self.model_path(),
            scaler: self.scaler_path(),
        };
        write_pair(&paths.model, &paths.scaler, set)?;

        let best = match self.read_best_loss() {
            Ok(best) => best,
            Err(e) => {
                warn!("ignoring the recorded best loss: {e}");
                None
            }
        };

        let is_best = best.is_none_or(|best| test_loss < best);
        if is_best {
            write_pair(&self.best_model_path(), &self.best_scaler_path(), set)?;
            // the loss goes last, a checkpoint is only valid once it's recorded
            write_atomic(&self.best_loss_path(), test_loss.to_string().as_bytes())?;
            info!("new best checkpoint with test loss {test_loss}");
        }

        Ok(PersistOutcome { paths, is_best })
    }

    /// Loads the artifacts of the last completed run.
    pub fn load_current(&self) -> Result<ArtifactSet, ArtifactError> {
        let _guard = self.lock.lock();
        load_pair(&self.model_path(), &self.scaler_path())
    }

    /// Loads the best checkpoint.
    pub fn load_best(&self) -> Result<ArtifactSet, ArtifactError> {
        let _guard = self.lock.lock();
        load_pair(&self.best_model_path(), &self.best_scaler_path())
    }

    /// Returns the recorded best held-out loss, if any.
    pub fn best_loss(&self) -> Result<Option<f64>, ArtifactError> {
        let _guard = self.lock.lock();
        self.read_best_loss()
    }

    /// Returns where the best checkpoint lives and its loss, if there is one.
    pub fn best_model_info(&self) -> Result<Option<BestModelInfo>, ArtifactError> {
        let _guard = self.lock.lock();

        let model_path = self.best_model_path();
        if !model_path.exists() {
            return Ok(None);
        }

        Ok(self
            .read_best_loss()?
            .map(|test_loss| BestModelInfo { model_path, test_loss }))
    }

    fn read_best_loss(&self) -> Result<Option<f64>, ArtifactError> {
        let path = self.best_loss_path();

        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(ArtifactError::Io { path, source }),
        };

        match raw.trim().parse::<f64>() {
            Ok(loss) if loss.is_finite() => Ok(Some(loss)),
            _ => Err(ArtifactError::InvalidBestLoss {
                path,
                value: raw.trim().to_string(),
            }),
        }
    }
}

fn load_pair(model_path: &Path, scaler_path: &Path) -> Result<ArtifactSet, ArtifactError> {
    let model: TrainedModel = read_json(model_path)?;
    let scaler: MinMaxScaler = read_json(scaler_path)?;
    Ok(ArtifactSet::new(model, scaler))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let raw = fs::read(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => ArtifactError::NotFound(path.to_path_buf()),
        _ => ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;

    serde_json::from_slice(&raw).map_err(|source| ArtifactError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, ArtifactError> {
    serde_json::to_vec(value).map_err(ArtifactError::Encode)
}

// Both files of a pair are staged before either one is renamed into place. If the scaler can't
// be committed the previous model is put back, so the pair on disk always comes from one run.
fn write_pair(
    model_path: &Path,
    scaler_path: &Path,
    set: &ArtifactSet,
) -> Result<(), ArtifactError> {
    let model_tmp = stage(model_path, &encode(&set.model)?)?;
    let scaler_tmp = match encode(&set.scaler).and_then(|raw| stage(scaler_path, &raw)) {
        Ok(tmp) => tmp,
        Err(e) => {
            discard(&model_tmp);
            return Err(e);
        }
    };

    let previous_model = match fs::read(model_path) {
        Ok(raw) => Some(raw),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(source) => {
            discard(&model_tmp);
            discard(&scaler_tmp);
            return Err(ArtifactError::Io {
                path: model_path.to_path_buf(),
                source,
            });
        }
    };

    if let Err(e) = commit(&model_tmp, model_path) {
        discard(&model_tmp);
        discard(&scaler_tmp);
        return Err(e);
    }

    if let Err(e) = commit(&scaler_tmp, scaler_path) {
        discard(&scaler_tmp);
        let restored = match previous_model {
            Some(raw) => write_atomic(model_path, &raw),
            None => fs::remove_file(model_path).map_err(|source| ArtifactError::Io {
                path: model_path.to_path_buf(),
                source,
            }),
        };

        if let Err(restore) = restored {
            error!("could not restore {}: {restore}", model_path.display());
        }

        return Err(e);
    }

    Ok(())
}

// Writes next to `path` and renames over it, readers see either the old or the new file.
fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), ArtifactError> {
    let tmp = stage(path, contents)?;
    commit(&tmp, path).inspect_err(|_| discard(&tmp))
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

fn stage(path: &Path, contents: &[u8]) -> Result<PathBuf, ArtifactError> {
    let tmp = tmp_path(path);
    fs::write(&tmp, contents).map_err(|source| ArtifactError::Io {
        path: tmp.clone(),
        source,
    })?;

    Ok(tmp)
}

fn commit(tmp: &Path, path: &Path) -> Result<(), ArtifactError> {
    fs::rename(tmp, path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn discard(tmp: &Path) {
    if let Err(e) = fs::remove_file(tmp) {
        warn!("could not remove {}: {e}", tmp.display());
    }
}
