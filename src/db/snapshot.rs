use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};
use crate::services::FestivalRecommender;

/// On-disk snapshot of a fitted recommender, encoded with bincode
#[derive(Debug, Clone)]
pub struct ModelStore {
    path: PathBuf,
}

impl ModelStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Writes the snapshot to a temporary file, then renames it into place
    pub fn save(&self, recommender: &FestivalRecommender) -> AppResult<()> {
        let data = bincode::serialize(recommender)
            .map_err(|e| AppError::Snapshot(format!("failed to encode model: {}", e)))?;

        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, &data)?;
        fs::rename(&temp_path, &self.path)?;

        tracing::info!(
            path = %self.path.display(),
            bytes = data.len(),
            "Model snapshot saved"
        );
        Ok(())
    }

    /// Reads and validates the snapshot. A missing, undecodable or
    /// inconsistent snapshot means the model is unavailable.
    pub fn load(&self) -> AppResult<FestivalRecommender> {
        tracing::debug!(path = %self.path.display(), "Loading model snapshot");

        if !self.path.exists() {
            tracing::error!(path = %self.path.display(), "Model snapshot not found");
            return Err(AppError::ModelUnavailable(format!(
                "model file not found: {}",
                self.path.display()
            )));
        }

        let data = fs::read(&self.path)?;
        let recommender: FestivalRecommender = bincode::deserialize(&data).map_err(|e| {
            AppError::ModelUnavailable(format!(
                "corrupted model snapshot {}: {}",
                self.path.display(),
                e
            ))
        })?;

        recommender.validate().map_err(|e| {
            AppError::ModelUnavailable(format!(
                "corrupted model snapshot {}: {}",
                self.path.display(),
                e
            ))
        })?;

        match recommender.model() {
            Some(model) => tracing::info!(
                events = model.len(),
                fitted_at = %model.fitted_at(),
                "Model snapshot loaded"
            ),
            None => tracing::warn!("Loaded snapshot of an unfitted model"),
        }

        Ok(recommender)
    }
}
