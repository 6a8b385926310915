//! Data loading, encoding and the persisted train/test contract.
//!
//! The preparation stage produces the artifacts described here and the later
//! stages only ever read them back through [`artifacts`], which checks every
//! matrix against the persisted [`schema::FeatureSchema`].

pub mod artifacts;
pub mod encoder;
pub mod frame;
pub mod loader;
pub mod preprocess;
pub mod schema;
pub mod split;

/// Class label. The pipeline predicts `0` (no restock) or `1` (restock), but
/// any integer classes are accepted.
pub type Label = i64;

/// Label value meaning "needs restock".
pub const RESTOCK: Label = 1;
