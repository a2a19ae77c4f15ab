//! Pedestrian detection and tracking pipeline.
//!
//! Frames go through a [`Detector`](integration::detect) stage (person class
//! filter, confidence threshold, NMS) and then a DeepSORT-style multi-object
//! tracker that keeps stable identities across frames. The
//! [`TrackerPipeline`] ties both together and supports live model reloads and
//! threshold updates.
//!
//! All boxes are TLWH (`[x, y, width, height]`, pixel coordinates).

pub mod error;
pub mod integration;
pub mod tracker;

pub use error::{Error, Result};
pub use integration::{
    AppearanceExtractor, ColorHistogramExtractor, DEFAULT_MODEL_VARIANT, DetectionParams, Frame,
    InferenceModel, ModelConfig, ModelHandle, ModelLoader, PipelineBuilder, PipelineStatus,
    RawDetection, SharedConfig, TrackerPipeline,
};
pub use tracker::{
    Association, DeepSortTracker, Detection, ObjectClass, Rect, Track, TrackSnapshot, TrackState,
    TrackerConfig,
};
