//! Integration layer: frames, detection models and the per-stream pipeline.
//!
//! Inference backends plug in through [`InferenceModel`] and [`ModelLoader`];
//! the Burn backend is available behind the `burn-backend` feature.

mod appearance;
mod builder;
mod config;
mod detector;
mod frame;
mod model;
mod passthrough;
mod pipeline;

pub use appearance::{AppearanceExtractor, ColorHistogramExtractor};
pub use builder::PipelineBuilder;
pub use config::{ModelConfig, SharedConfig};
pub use detector::{
    DetectionParams, InferenceModel, PERSON_CLASS_ID, RawDetection, detect, non_max_suppression,
};
pub use frame::Frame;
pub use model::{DEFAULT_MODEL_VARIANT, ModelHandle, ModelLoader};
pub use passthrough::PassthroughTracker;
pub use pipeline::{PipelineStatus, TrackerPipeline};

#[cfg(feature = "burn-backend")]
mod burn_backend;

#[cfg(feature = "burn-backend")]
pub use burn_backend::{BurnDetector, BurnModel, BurnPrediction};
