//! Scaling, classification and evaluation.

pub mod forest;
pub mod metrics;
pub mod scaler;
pub mod search;
pub mod tree;

pub use forest::{ForestParams, ModelMetadata, RandomForest};
pub use metrics::{ClassificationReport, ConfusionMatrix, Evaluation, accuracy};
pub use scaler::StandardScaler;
pub use search::{GridSearch, KFold, SearchOutcome};
