use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinError;

use crate::{
    config::Config,
    db::{CatalogStore, ModelStore},
    error::{AppError, AppResult},
    models::{Catalog, Event},
};

use super::FestivalRecommender;

/// Fits a recommender on the stored catalog and persists the snapshot
pub fn train(
    catalog_store: &CatalogStore,
    model_store: &ModelStore,
) -> AppResult<FestivalRecommender> {
    let catalog = catalog_store.load()?;
    let recommender = FestivalRecommender::fitted(&catalog);
    model_store.save(&recommender)?;
    Ok(recommender)
}

/// Holds the live recommender snapshot and coordinates catalog updates.
///
/// Readers clone the current `Arc` and keep using it for the whole request;
/// every update fits a fresh recommender and swaps it in. Updates are
/// serialized so the catalog file, the snapshot file and the live model move
/// together.
pub struct ModelRegistry {
    catalog_store: CatalogStore,
    model_store: ModelStore,
    current: RwLock<Option<Arc<FestivalRecommender>>>,
    updates: Mutex<()>,
}

impl ModelRegistry {
    pub fn new(catalog_store: CatalogStore, model_store: ModelStore) -> Self {
        Self {
            catalog_store,
            model_store,
            current: RwLock::new(None),
            updates: Mutex::new(()),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            CatalogStore::new(&config.catalog_path),
            ModelStore::new(&config.model_path),
        )
    }

    /// Current snapshot, loading it from disk when none is held in memory
    pub async fn current(&self) -> AppResult<Arc<FestivalRecommender>> {
        if let Some(recommender) = self.current.read().await.as_ref() {
            return Ok(Arc::clone(recommender));
        }

        let model_store = self.model_store.clone();
        let loaded = tokio::task::spawn_blocking(move || model_store.load())
            .await
            .map_err(join_error)??;

        let mut current = self.current.write().await;
        // an update may have installed a newer model while the file was read
        Ok(Arc::clone(current.get_or_insert_with(|| Arc::new(loaded))))
    }

    /// Loads the snapshot at startup, training one from the catalog file
    /// when no snapshot exists yet
    pub async fn warm_up(&self) {
        let result = if self.model_store.exists() || !self.catalog_store.path().exists() {
            self.current()
                .await
                .map(|recommender| recommender.model().map_or(0, |model| model.len()))
        } else {
            tracing::info!("No model snapshot, training from the catalog file");
            self.retrain().await
        };

        match result {
            Ok(events) => tracing::info!(events, "Recommender ready"),
            Err(e) => tracing::warn!(
                error = %e,
                "Recommender not ready; recommendations fail until the catalog is updated"
            ),
        }
    }

    /// Adds or replaces events, re-fits and persists. Returns the catalog size.
    pub async fn add_events(&self, events: Vec<Event>) -> AppResult<usize> {
        let _guard = self.updates.lock().await;

        let catalog_store = self.catalog_store.clone();
        let model_store = self.model_store.clone();
        let (recommender, total) = tokio::task::spawn_blocking(move || -> AppResult<_> {
            let (catalog, staged) = catalog_store.upsert(events)?;
            let recommender = FestivalRecommender::fitted(&catalog);
            model_store.save(&recommender)?;
            staged.commit()?;
            Ok((recommender, catalog.len()))
        })
        .await
        .map_err(join_error)??;

        self.install(recommender).await;
        Ok(total)
    }

    /// Empties the catalog and re-fits on it
    pub async fn reset_catalog(&self) -> AppResult<()> {
        let _guard = self.updates.lock().await;

        let catalog_store = self.catalog_store.clone();
        let model_store = self.model_store.clone();
        let recommender = tokio::task::spawn_blocking(move || -> AppResult<_> {
            let staged = catalog_store.reset()?;
            let recommender = FestivalRecommender::fitted(&Catalog::new());
            model_store.save(&recommender)?;
            staged.commit()?;
            Ok(recommender)
        })
        .await
        .map_err(join_error)??;

        self.install(recommender).await;
        Ok(())
    }

    /// Re-fits on the catalog file as it is now
    pub async fn retrain(&self) -> AppResult<usize> {
        let _guard = self.updates.lock().await;

        let catalog_store = self.catalog_store.clone();
        let model_store = self.model_store.clone();
        let recommender =
            tokio::task::spawn_blocking(move || train(&catalog_store, &model_store))
                .await
                .map_err(join_error)??;

        let events = recommender.model().map_or(0, |model| model.len());
        self.install(recommender).await;
        Ok(events)
    }

    async fn install(&self, recommender: FestivalRecommender) {
        *self.current.write().await = Some(Arc::new(recommender));
        tracing::debug!("Installed new recommender snapshot");
    }
}

fn join_error(e: JoinError) -> AppError {
    AppError::Internal(format!("background task failed: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Recommendation, UserQuery};
    use std::fs;

    fn registry_in(dir: &tempfile::TempDir) -> ModelRegistry {
        ModelRegistry::new(
            CatalogStore::new(dir.path().join("eventlist.csv")),
            ModelStore::new(dir.path().join("model.bin")),
        )
    }

    fn jazz_fan() -> Vec<UserQuery> {
        vec![UserQuery::new("u1", vec!["jazz".to_string()], vec![])]
    }

    #[tokio::test]
    async fn test_current_without_snapshot_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry_in(&dir);
        assert!(matches!(
            registry.current().await,
            Err(AppError::ModelUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_add_events_fits_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry_in(&dir);

        let total = registry
            .add_events(vec![
                Event::new("1", "jazz festival", "music", "seoul", ""),
                Event::new("2", "food fair", "food", "busan", ""),
            ])
            .await
            .unwrap();
        assert_eq!(total, 2);

        let results = registry.current().await.unwrap().recommend(&jazz_fan(), 1).unwrap();
        assert_eq!(
            results[0].recommendation,
            Recommendation::Recommendations(vec!["1".to_string()])
        );

        // a fresh registry picks the persisted snapshot up from disk
        let reopened = registry_in(&dir);
        let results = reopened.current().await.unwrap().recommend(&jazz_fan(), 1).unwrap();
        assert_eq!(
            results[0].recommendation,
            Recommendation::Recommendations(vec!["1".to_string()])
        );
    }

    #[tokio::test]
    async fn test_failed_snapshot_save_keeps_catalog_and_model() {
        let dir = tempfile::tempdir().unwrap();
        let catalog_path = dir.path().join("eventlist.csv");
        fs::write(
            &catalog_path,
            "eventid,title,category,location,description\n1,jazz festival,music,seoul,\n",
        )
        .unwrap();
        let registry = ModelRegistry::new(
            CatalogStore::new(&catalog_path),
            ModelStore::new(dir.path().join("missing").join("model.bin")),
        );

        let result = registry
            .add_events(vec![Event::new("2", "food fair", "food", "busan", "")])
            .await;
        assert!(matches!(result, Err(AppError::Io(_))));

        let catalog = CatalogStore::new(&catalog_path).load().unwrap();
        assert_eq!(catalog.len(), 1);
        assert!(!dir.path().join("eventlist.csv.tmp").exists());
        assert!(matches!(
            registry.current().await,
            Err(AppError::ModelUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_reset_leaves_degenerate_model() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry_in(&dir);
        registry
            .add_events(vec![Event::new("1", "jazz festival", "music", "seoul", "")])
            .await
            .unwrap();

        registry.reset_catalog().await.unwrap();

        let current = registry.current().await.unwrap();
        assert!(current.model().unwrap().is_empty());
        let results = current.recommend(&jazz_fan(), 5).unwrap();
        assert_eq!(results[0].recommendation, Recommendation::NoRecommendation);
        assert!(CatalogStore::new(dir.path().join("eventlist.csv"))
            .load()
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_held_snapshot_survives_update() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry_in(&dir);
        registry
            .add_events(vec![Event::new("1", "jazz festival", "music", "seoul", "")])
            .await
            .unwrap();

        let before = registry.current().await.unwrap();
        registry.reset_catalog().await.unwrap();

        assert_eq!(before.model().unwrap().len(), 1);
        assert!(registry.current().await.unwrap().model().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_retrain_reads_catalog_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("eventlist.csv"),
            "eventid,title,category,location,description,status\n\
             1,jazz festival,music,seoul,,END\n\
             2,jazz night,music,busan,,\n",
        )
        .unwrap();
        let registry = registry_in(&dir);

        assert_eq!(registry.retrain().await.unwrap(), 1);
        let results = registry.current().await.unwrap().recommend(&jazz_fan(), 5).unwrap();
        assert_eq!(
            results[0].recommendation,
            Recommendation::Recommendations(vec!["2".to_string()])
        );
    }
}
