use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Catalog, Event, EventId, Recommendation, RecommendationResult, UserQuery};

use super::similarity::{similarities, top_k};
use super::vectorizer::{SparseVector, TfidfVectorizer};

/// Number of events recommended per user unless configured otherwise
pub const DEFAULT_TOP_N: usize = 5;

/// Error types for the recommendation engine
#[derive(Debug, Error, PartialEq)]
pub enum RecommenderError {
    #[error("Recommender has not been fitted")]
    NotFitted,
    #[error("Ranked row {row} is outside the {rows} fitted event ids")]
    RowOutOfRange { row: usize, rows: usize },
    #[error("Fitted model is misaligned: {vectors} vectors for {ids} event ids")]
    MisalignedModel { vectors: usize, ids: usize },
}

/// Snapshot produced by a fit: vocabulary, one vector per active event and
/// the event ids aligned with those vectors by row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedModel {
    vectorizer: TfidfVectorizer,
    vectors: Vec<SparseVector>,
    event_ids: Vec<EventId>,
    catalog: Catalog,
    fitted_at: DateTime<Utc>,
}

impl FittedModel {
    fn build(catalog: Catalog) -> Self {
        let documents: Vec<String> = catalog.iter().map(Event::combined_features).collect();
        let (vectorizer, vectors) = TfidfVectorizer::fit_transform(&documents);
        let event_ids = catalog.iter().map(|event| event.eventid.clone()).collect();

        Self {
            vectorizer,
            vectors,
            event_ids,
            catalog,
            fitted_at: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.event_ids.len()
    }

    /// True in the degenerate state reached by fitting an empty catalog
    pub fn is_empty(&self) -> bool {
        self.event_ids.is_empty()
    }

    pub fn event_ids(&self) -> &[EventId] {
        &self.event_ids
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn vectorizer(&self) -> &TfidfVectorizer {
        &self.vectorizer
    }

    pub fn fitted_at(&self) -> DateTime<Utc> {
        self.fitted_at
    }

    /// Similarity of `text` to every fitted event, in row order
    pub fn scores(&self, text: &str) -> Vec<f64> {
        let query = self.vectorizer.transform_one(text);
        similarities(&query, &self.vectors)
    }

    fn validate(&self) -> Result<(), RecommenderError> {
        if self.vectors.len() != self.event_ids.len() || !self.vectorizer.is_consistent() {
            return Err(RecommenderError::MisalignedModel {
                vectors: self.vectors.len(),
                ids: self.event_ids.len(),
            });
        }
        Ok(())
    }

    fn recommend_for(
        &self,
        user: &UserQuery,
        top_n: usize,
    ) -> Result<Recommendation, RecommenderError> {
        let interest = user.interest_text();
        if interest.is_empty() {
            tracing::debug!(user_id = %user.userid, "Empty interest text, no recommendation");
            return Ok(Recommendation::NoRecommendation);
        }

        let scores = self.scores(&interest);
        let ids = top_k(&scores, top_n)
            .into_iter()
            .map(|row| {
                self.event_ids
                    .get(row)
                    .map(EventId::to_string)
                    .ok_or(RecommenderError::RowOutOfRange {
                        row,
                        rows: self.event_ids.len(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Recommendation::Recommendations(ids))
    }
}

/// Content-based festival recommender.
///
/// Starts unfit; every `fit` replaces the whole model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FestivalRecommender {
    model: Option<FittedModel>,
}

impl FestivalRecommender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a recommender fitted on `catalog`
    pub fn fitted(catalog: &Catalog) -> Self {
        let mut recommender = Self::new();
        recommender.fit(catalog);
        recommender
    }

    /// Fits on the active events of `catalog`, dropping events whose status is `END`
    pub fn fit(&mut self, catalog: &Catalog) {
        tracing::debug!(catalog_size = catalog.len(), "Fitting recommender");

        let (active, removed) = catalog.active();
        if catalog.has_status() {
            tracing::info!(
                removed,
                remaining = active.len(),
                "Removed ended events before fitting"
            );
        } else {
            tracing::debug!("No lifecycle status in catalog, using all events");
        }

        if active.is_empty() {
            tracing::warn!("Fitting on an empty catalog, recommendations unavailable");
        }

        let model = FittedModel::build(active);
        tracing::info!(
            events = model.len(),
            vocabulary = model.vectorizer.vocabulary_len(),
            "Recommender fitted"
        );
        self.model = Some(model);
    }

    pub fn is_fitted(&self) -> bool {
        self.model.is_some()
    }

    pub fn model(&self) -> Option<&FittedModel> {
        self.model.as_ref()
    }

    /// Checks that vectors and event ids line up; used after loading a snapshot
    pub fn validate(&self) -> Result<(), RecommenderError> {
        match &self.model {
            Some(model) => model.validate(),
            None => Ok(()),
        }
    }

    /// Recommends up to `top_n` events per user, one result per user in
    /// input order. A failure for one user yields `NoRecommendation` for that
    /// user only.
    pub fn recommend(
        &self,
        users: &[UserQuery],
        top_n: usize,
    ) -> Result<Vec<RecommendationResult>, RecommenderError> {
        let model = self.model.as_ref().ok_or(RecommenderError::NotFitted)?;

        if model.is_empty() {
            tracing::warn!(
                users = users.len(),
                "No fitted events, returning no recommendation for every user"
            );
            return Ok(users
                .iter()
                .map(|user| RecommendationResult::none(user.userid.clone()))
                .collect());
        }

        let results = users
            .iter()
            .map(|user| {
                let recommendation = match model.recommend_for(user, top_n) {
                    Ok(recommendation) => recommendation,
                    Err(e) => {
                        tracing::error!(
                            user_id = %user.userid,
                            catalog_size = model.len(),
                            error = %e,
                            "Failed to score user, returning no recommendation"
                        );
                        Recommendation::NoRecommendation
                    }
                };
                RecommendationResult {
                    userid: user.userid.clone(),
                    recommendation,
                }
            })
            .collect();

        Ok(results)
    }
}
