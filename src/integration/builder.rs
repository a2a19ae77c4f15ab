//! Builder for assembling a [`TrackerPipeline`].

use std::sync::Arc;

use crate::error::Result;
use crate::integration::pipeline::TrackingBackend;
use crate::integration::passthrough::PassthroughTracker;
use crate::integration::{
    AppearanceExtractor, ColorHistogramExtractor, ModelConfig, ModelHandle, ModelLoader,
    SharedConfig, TrackerPipeline,
};
use crate::tracker::{DeepSortTracker, TrackerConfig};

/// Builder for a [`TrackerPipeline`].
///
/// By default the pipeline has no model (every frame yields no tracks), uses
/// default configs, and extracts colour-histogram descriptors.
pub struct PipelineBuilder {
    tracker_config: TrackerConfig,
    model_config: ModelConfig,
    shared_config: Option<SharedConfig>,
    loader: Option<Box<dyn ModelLoader>>,
    default_variant: Option<String>,
    models: Option<Arc<ModelHandle>>,
    extractor: Option<Box<dyn AppearanceExtractor>>,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self {
            tracker_config: TrackerConfig::default(),
            model_config: ModelConfig::default(),
            shared_config: None,
            loader: None,
            default_variant: None,
            models: None,
            extractor: Some(Box::new(ColorHistogramExtractor::default())),
        }
    }
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tracker_config(mut self, config: TrackerConfig) -> Self {
        self.tracker_config = config;
        self
    }

    /// Initial model configuration. Ignored when a shared config is given.
    pub fn model_config(mut self, config: ModelConfig) -> Self {
        self.model_config = config;
        self
    }

    /// Use a configuration shared with other pipelines.
    pub fn shared_config(mut self, config: SharedConfig) -> Self {
        self.shared_config = Some(config);
        self
    }

    /// Loader for a fresh model handle. The configured variant is loaded
    /// during [`build`](Self::build).
    pub fn loader<L: ModelLoader + 'static>(mut self, loader: L) -> Self {
        self.loader = Some(Box::new(loader));
        self
    }

    /// Fallback variant for a fresh model handle.
    pub fn default_variant(mut self, variant: impl Into<String>) -> Self {
        self.default_variant = Some(variant.into());
        self
    }

    /// Use a model handle shared with other pipelines. Takes precedence over
    /// [`loader`](Self::loader).
    pub fn shared_models(mut self, models: Arc<ModelHandle>) -> Self {
        self.models = Some(models);
        self
    }

    pub fn extractor<E: AppearanceExtractor + 'static>(mut self, extractor: E) -> Self {
        self.extractor = Some(Box::new(extractor));
        self
    }

    /// Match on motion and IoU only.
    pub fn without_appearance(mut self) -> Self {
        self.extractor = None;
        self
    }

    /// Build the pipeline.
    ///
    /// Fails only on an invalid model configuration. A model that cannot be
    /// loaded is logged and left to [`TrackerPipeline::reload_model`]; an
    /// invalid tracker configuration puts the pipeline in passthrough mode.
    pub fn build(self) -> Result<TrackerPipeline> {
        let config = match self.shared_config {
            Some(shared) => shared,
            None => SharedConfig::new(self.model_config)?,
        };

        let models = match (self.models, self.loader) {
            (Some(models), _) => models,
            (None, loader) => {
                let mut handle = match loader {
                    Some(loader) => ModelHandle::from_boxed(loader),
                    None => ModelHandle::unloaded(),
                };
                if let Some(variant) = self.default_variant {
                    handle = handle.with_default_variant(variant);
                }
                let handle = Arc::new(handle);
                if handle.has_loader() {
                    let variant = config.snapshot().model_variant.clone();
                    if let Err(e) = handle.reload(&variant) {
                        log::warn!("initial model load failed: {e}");
                    }
                }
                handle
            }
        };

        let (backend, unavailable) = match DeepSortTracker::new(self.tracker_config) {
            Ok(tracker) => (TrackingBackend::Active(tracker), None),
            Err(e) => {
                log::warn!("{e}; running in passthrough mode");
                (TrackingBackend::Passthrough(PassthroughTracker::new()), Some(e))
            }
        };

        log::info!(
            "pipeline ready: tracker {}, model {:?}",
            if unavailable.is_none() { "active" } else { "passthrough" },
            models.active_variant()
        );
        Ok(TrackerPipeline::from_parts(
            models,
            config,
            backend,
            unavailable,
            self.extractor,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::integration::{Frame, InferenceModel, RawDetection};

    struct Empty(&'static str);

    impl InferenceModel for Empty {
        fn variant(&self) -> &str {
            self.0
        }

        fn infer(&self, _frame: &Frame) -> crate::Result<Vec<RawDetection>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_default_build_has_no_model() {
        let pipeline = PipelineBuilder::new().build().unwrap();
        assert!(pipeline.active());
        assert!(pipeline.models().current().is_none());
        assert_eq!(*pipeline.config(), ModelConfig::default());
    }

    #[test]
    fn test_build_loads_configured_variant() {
        let pipeline = PipelineBuilder::new()
            .loader(|variant: &str| -> crate::Result<Arc<dyn InferenceModel>> {
                match variant {
                    "yolov8s" => Ok(Arc::new(Empty("yolov8s"))),
                    _ => Err(Error::model_load(variant, "missing")),
                }
            })
            .build()
            .unwrap();
        assert_eq!(pipeline.models().active_variant().as_deref(), Some("yolov8s"));
    }

    #[test]
    fn test_build_falls_back_to_default_variant() {
        let pipeline = PipelineBuilder::new()
            .model_config(ModelConfig {
                model_variant: "yolov8x".into(),
                ..Default::default()
            })
            .default_variant("tiny")
            .loader(|variant: &str| -> crate::Result<Arc<dyn InferenceModel>> {
                match variant {
                    "tiny" => Ok(Arc::new(Empty("tiny"))),
                    _ => Err(Error::model_load(variant, "missing")),
                }
            })
            .build()
            .unwrap();
        assert_eq!(pipeline.models().active_variant().as_deref(), Some("tiny"));
    }

    #[test]
    fn test_invalid_model_config_fails_build() {
        let result = PipelineBuilder::new()
            .model_config(ModelConfig {
                confidence_threshold: 2.0,
                ..Default::default()
            })
            .build();
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }
}
