pub mod engine;
pub mod fallback;
pub mod features;
pub mod model;
pub mod trainer;

// Re-exports for easy access
pub use engine::GradingEngine;
pub use model::{ForestRegressor, ModelBundle, TextVectorizer};
pub use trainer::MIN_SAMPLES;
