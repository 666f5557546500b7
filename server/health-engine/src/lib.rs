//! Repository Health Engine: hybrid model + rule abandonment-risk scoring.
//!
//! Extracts the canonical feature vector from repository metadata, scales it
//! with the normalization state captured at training time, scores it with a
//! trained classifier, and fuses the score with rule-based activity signals
//! into a status and recommendations. Also labels snapshots and fits the
//! normalizer for training-set preparation.
//!
//! No network, no DB; pure computation over read-only artifacts.

pub mod config;
pub mod decision;
pub mod engine;
pub mod error;
pub mod features;
pub mod label;
pub mod model;
pub mod normalizer;
pub mod scorer;
pub mod source;
pub mod training;
pub mod types;

pub use config::Config;
pub use engine::Engine;
pub use error::EngineError;
pub use label::LabelRule;
pub use model::{ArtifactCache, Artifacts, Classifier};
pub use normalizer::NormalizationState;
pub use types::{AssessRequest, Assessment, RepositorySnapshot};
