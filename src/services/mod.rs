pub mod maintenance;
pub mod recommender;
pub mod registry;
pub mod similarity;
pub mod vectorizer;

pub use recommender::{FestivalRecommender, FittedModel, RecommenderError, DEFAULT_TOP_N};
pub use registry::ModelRegistry;
