//! TrackerPipeline: detection, appearance extraction and tracking per stream.

use std::sync::Arc;
use std::thread::JoinHandle;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::integration::detector;
use crate::integration::passthrough::PassthroughTracker;
use crate::integration::{
    AppearanceExtractor, Frame, ModelConfig, ModelHandle, PipelineBuilder, SharedConfig,
};
use crate::tracker::{DeepSortTracker, Detection, TrackSnapshot};

pub(crate) enum TrackingBackend {
    Active(DeepSortTracker),
    Passthrough(PassthroughTracker),
}

/// Health summary of one pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineStatus {
    /// False when running in passthrough mode
    pub active: bool,
    pub model_loading: bool,
    /// Variant actually loaded, if any
    pub model_variant: Option<String>,
    pub live_tracks: usize,
    pub frames_processed: u64,
}

/// End-to-end pedestrian tracking for one video stream.
///
/// Frames are processed in call order through `&mut self`. The model handle
/// and configuration may be shared with other pipelines; track state is not.
pub struct TrackerPipeline {
    models: Arc<ModelHandle>,
    config: SharedConfig,
    backend: TrackingBackend,
    unavailable: Option<Error>,
    extractor: Option<Box<dyn AppearanceExtractor>>,
    frames_processed: u64,
}

impl TrackerPipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    pub(crate) fn from_parts(
        models: Arc<ModelHandle>,
        config: SharedConfig,
        backend: TrackingBackend,
        unavailable: Option<Error>,
        extractor: Option<Box<dyn AppearanceExtractor>>,
    ) -> Self {
        Self {
            models,
            config,
            backend,
            unavailable,
            extractor,
            frames_processed: 0,
        }
    }

    /// Process one frame and return the confirmed tracks.
    ///
    /// If detection fails the error is returned and the track state is left
    /// exactly as it was.
    pub fn process_frame(&mut self, frame: &Frame) -> Result<Vec<TrackSnapshot>> {
        let mut detections = self.detect(frame)?;
        self.frames_processed += 1;

        let tracks = match &mut self.backend {
            TrackingBackend::Active(tracker) => {
                if let Some(extractor) = &mut self.extractor {
                    attach_features(&mut **extractor, frame, &mut detections);
                }
                tracker.update(&detections)
            }
            TrackingBackend::Passthrough(passthrough) => passthrough.update(&detections),
        };
        Ok(tracks)
    }

    /// Run detection alone, with the current config and model snapshots.
    pub fn detect(&self, frame: &Frame) -> Result<Vec<Detection>> {
        let config = self.config.snapshot();
        let model = self.models.current();
        detector::detect(frame, &config.detection_params(), model.as_deref())
    }

    /// Swap the detection model, blocking until done. See [`ModelHandle::reload`].
    pub fn reload_model(&self, variant: &str) -> Result<()> {
        self.models.reload(variant)
    }

    /// Reload the model on a background thread.
    pub fn spawn_reload(&self, variant: impl Into<String>) -> Result<JoinHandle<Result<()>>> {
        let variant = variant.into();
        let models = Arc::clone(&self.models);
        let name = variant.clone();
        std::thread::Builder::new()
            .name("model-reload".into())
            .spawn(move || models.reload(&name))
            .map_err(|e| Error::model_load(variant, e.to_string()))
    }

    /// Replace the model configuration atomically.
    ///
    /// When the variant changes, a background reload starts and its handle is
    /// returned. The reload loads the variant configured when it gets its
    /// turn, so back-to-back updates end on the last one. An invalid config is
    /// rejected and nothing changes.
    pub fn update_config(&self, config: ModelConfig) -> Result<Option<JoinHandle<Result<()>>>> {
        let variant = config.model_variant.clone();
        let previous = self.config.replace(config)?;
        log::info!("model config updated (was {previous:?})");
        if previous.model_variant == variant {
            return Ok(None);
        }

        let models = Arc::clone(&self.models);
        let shared = self.config.clone();
        std::thread::Builder::new()
            .name("model-reload".into())
            .spawn(move || models.reload_with(|| shared.snapshot().model_variant.clone()))
            .map(Some)
            .map_err(|e| Error::model_load(variant, e.to_string()))
    }

    pub fn config(&self) -> Arc<ModelConfig> {
        self.config.snapshot()
    }

    /// False when the tracker failed to initialise and ids are passthrough.
    pub fn active(&self) -> bool {
        matches!(self.backend, TrackingBackend::Active(_))
    }

    /// Why the tracker is unavailable, in passthrough mode.
    pub fn tracker_unavailable(&self) -> Option<&Error> {
        self.unavailable.as_ref()
    }

    pub fn models(&self) -> &Arc<ModelHandle> {
        &self.models
    }

    pub fn shared_config(&self) -> &SharedConfig {
        &self.config
    }

    pub fn tracker(&self) -> Option<&DeepSortTracker> {
        match &self.backend {
            TrackingBackend::Active(tracker) => Some(tracker),
            TrackingBackend::Passthrough(_) => None,
        }
    }

    pub fn status(&self) -> PipelineStatus {
        let live_tracks = match &self.backend {
            TrackingBackend::Active(tracker) => tracker.store().len(),
            TrackingBackend::Passthrough(passthrough) => passthrough.len(),
        };
        PipelineStatus {
            active: self.active(),
            model_loading: self.models.is_loading(),
            model_variant: self.models.active_variant(),
            live_tracks,
            frames_processed: self.frames_processed,
        }
    }
}

/// Attach appearance descriptors to `detections`. Failures leave them bare.
fn attach_features(
    extractor: &mut dyn AppearanceExtractor,
    frame: &Frame,
    detections: &mut [Detection],
) {
    if detections.is_empty() {
        return;
    }

    let boxes: Vec<_> = detections.iter().map(|d| d.bbox).collect();
    let features = match extractor.extract(frame, &boxes) {
        Ok(features) if features.len() == detections.len() => features,
        Ok(features) => {
            let err = Error::Appearance(format!(
                "{} descriptors for {} boxes",
                features.len(),
                detections.len()
            ));
            log::warn!("{err}; matching on geometry only");
            return;
        }
        Err(err) => {
            log::warn!("{err}; matching on geometry only");
            return;
        }
    };

    for (detection, feature) in detections.iter_mut().zip(features) {
        detection.feature = Some(feature);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integration::{InferenceModel, RawDetection};
    use crate::tracker::{Rect, TrackerConfig};
    use ndarray::Array1;

    struct OnePerson;

    impl InferenceModel for OnePerson {
        fn variant(&self) -> &str {
            "one-person"
        }

        fn infer(&self, _frame: &Frame) -> Result<Vec<RawDetection>> {
            Ok(vec![RawDetection::person(Rect::new(100.0, 50.0, 40.0, 100.0), 0.9)])
        }
    }

    struct ShortExtractor;

    impl AppearanceExtractor for ShortExtractor {
        fn extract(&mut self, _frame: &Frame, _boxes: &[Rect]) -> Result<Vec<Array1<f32>>> {
            Ok(Vec::new())
        }
    }

    fn pipeline() -> TrackerPipeline {
        let loader = |_: &str| -> Result<Arc<dyn InferenceModel>> { Ok(Arc::new(OnePerson)) };
        TrackerPipeline::builder().loader(loader).build().unwrap()
    }

    #[test]
    fn test_confirms_after_three_frames() {
        let mut pipeline = pipeline();
        let frame = Frame::filled(320, 240, [90, 90, 90]).unwrap();

        assert!(pipeline.process_frame(&frame).unwrap().is_empty());
        assert!(pipeline.process_frame(&frame).unwrap().is_empty());
        let tracks = pipeline.process_frame(&frame).unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].track_id, 1);
        assert_eq!(tracks[0].hits, 3);
    }

    #[test]
    fn test_features_attached_by_default() {
        let pipeline = pipeline();
        let frame = Frame::filled(320, 240, [90, 90, 90]).unwrap();
        let mut detections = pipeline.detect(&frame).unwrap();
        let mut extractor = crate::integration::ColorHistogramExtractor::default();
        attach_features(&mut extractor, &frame, &mut detections);
        assert_eq!(detections[0].feature.as_ref().map(|f| f.len()), Some(48));
    }

    #[test]
    fn test_short_extractor_output_is_ignored() {
        let frame = Frame::filled(320, 240, [90, 90, 90]).unwrap();
        let mut detections = vec![Detection::new(Rect::new(1.0, 1.0, 10.0, 10.0), 0.9)];
        attach_features(&mut ShortExtractor, &frame, &mut detections);
        assert!(detections[0].feature.is_none());
    }

    struct BrokenExtractor;

    impl AppearanceExtractor for BrokenExtractor {
        fn extract(&mut self, _frame: &Frame, _boxes: &[Rect]) -> Result<Vec<Array1<f32>>> {
            Err(Error::Appearance("crop buffer unavailable".into()))
        }
    }

    #[test]
    fn test_extractor_failure_falls_back_to_geometry() {
        let loader = |_: &str| -> Result<Arc<dyn InferenceModel>> { Ok(Arc::new(OnePerson)) };
        let mut pipeline = TrackerPipeline::builder()
            .loader(loader)
            .extractor(BrokenExtractor)
            .build()
            .unwrap();
        let frame = Frame::filled(320, 240, [90, 90, 90]).unwrap();

        pipeline.process_frame(&frame).unwrap();
        pipeline.process_frame(&frame).unwrap();
        let tracks = pipeline.process_frame(&frame).unwrap();

        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].track_id, 1);
        assert_eq!(tracks[0].hits, 3);
        let track = pipeline.tracker().unwrap().store().get(1).unwrap();
        assert!(track.features.is_empty());
    }

    #[test]
    fn test_status_reports_passthrough() {
        let pipeline = TrackerPipeline::builder()
            .tracker_config(TrackerConfig {
                nn_budget: Some(0),
                ..Default::default()
            })
            .build()
            .unwrap();
        let status = pipeline.status();
        assert!(!status.active);
        assert_eq!(status.model_variant, None);
        assert!(pipeline.tracker().is_none());
        assert!(matches!(
            pipeline.tracker_unavailable(),
            Some(Error::TrackerUnavailable(_))
        ));
    }
}
