//! Error types surfaced by the pipeline.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The frame could not be decoded or its buffer is malformed.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// A detection model could not be loaded.
    #[error("failed to load model `{variant}`: {reason}")]
    ModelLoad { variant: String, reason: String },

    /// The tracking backend could not be initialised; the pipeline runs in
    /// passthrough mode.
    #[error("tracker unavailable: {0}")]
    TrackerUnavailable(String),

    /// The model failed while running on a frame.
    #[error("inference failed: {0}")]
    Inference(String),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Appearance descriptor extraction failed.
    #[error("appearance extraction failed: {0}")]
    Appearance(String),
}

impl Error {
    pub fn invalid_frame<S: Into<String>>(msg: S) -> Self {
        Self::InvalidFrame(msg.into())
    }

    pub fn model_load<V: Into<String>, R: Into<String>>(variant: V, reason: R) -> Self {
        Self::ModelLoad {
            variant: variant.into(),
            reason: reason.into(),
        }
    }

    pub fn inference<S: Into<String>>(msg: S) -> Self {
        Self::Inference(msg.into())
    }

    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
