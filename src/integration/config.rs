//! Runtime-mutable model configuration.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::integration::DetectionParams;

/// Detection settings shared by every stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub confidence_threshold: f32,
    pub nms_iou_threshold: f32,
    pub model_variant: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.65,
            nms_iou_threshold: 0.45,
            model_variant: "yolov8s".to_string(),
        }
    }
}

impl ModelConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("confidence_threshold", self.confidence_threshold),
            ("nms_iou_threshold", self.nms_iou_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::invalid_config(format!("{name} {value} outside [0, 1]")));
            }
        }
        if self.model_variant.trim().is_empty() {
            return Err(Error::invalid_config("model_variant is empty"));
        }
        Ok(())
    }

    pub fn detection_params(&self) -> DetectionParams {
        DetectionParams {
            confidence_threshold: self.confidence_threshold,
            nms_iou_threshold: self.nms_iou_threshold,
        }
    }
}

/// Cloneable handle to a [`ModelConfig`] that is replaced as a whole.
///
/// Readers get an `Arc` snapshot and never observe a half-applied update.
#[derive(Debug, Clone)]
pub struct SharedConfig {
    inner: Arc<RwLock<Arc<ModelConfig>>>,
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(ModelConfig::default()))),
        }
    }
}

impl SharedConfig {
    pub fn new(config: ModelConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(RwLock::new(Arc::new(config))),
        })
    }

    pub fn snapshot(&self) -> Arc<ModelConfig> {
        self.inner.read().clone()
    }

    /// Validate and install `config`, returning the one it replaced.
    pub fn replace(&self, config: ModelConfig) -> Result<Arc<ModelConfig>> {
        config.validate()?;
        let previous = std::mem::replace(&mut *self.inner.write(), Arc::new(config));
        Ok(previous)
    }
}
