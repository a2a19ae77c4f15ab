//! Burn inference backend for pedestrian detection.
//!
//! Wraps any detection network implemented with Burn so it can be loaded into
//! a [`ModelHandle`](crate::integration::ModelHandle).
//!
//! # Example
//!
//! ```ignore
//! use burn::backend::NdArray;
//! use pedtrack::integration::{BurnDetector, BurnModel, BurnPrediction};
//!
//! struct MyYoloModel { /* ... */ }
//!
//! impl BurnModel<NdArray> for MyYoloModel {
//!     fn forward(&self, input: burn::tensor::Tensor<NdArray, 4>) -> Vec<BurnPrediction> {
//!         // Run inference
//!     }
//! }
//!
//! let loader = |variant: &str| -> pedtrack::Result<Arc<dyn InferenceModel>> {
//!     let model = MyYoloModel::load(&format!("{variant}.bin"))?;
//!     Ok(Arc::new(BurnDetector::new(variant, model, Default::default())))
//! };
//! ```

use std::marker::PhantomData;

use burn::prelude::*;
use burn::tensor::Tensor;
use image::imageops::{self, FilterType};

use crate::error::{Error, Result};
use crate::integration::detector::PERSON_CLASS_ID;
use crate::integration::{Frame, InferenceModel, RawDetection};
use crate::tracker::Rect;

/// Raw network output for one candidate, in model input coordinates.
#[derive(Debug, Clone)]
pub struct BurnPrediction {
    /// `[cx, cy, w, h]` or `[x1, y1, x2, y2]` depending on the model
    pub bbox: [f32; 4],
    pub score: f32,
    /// COCO class; `None` for single-class (person-only) models
    pub class_id: Option<usize>,
}

/// Trait for Burn-based detection models.
pub trait BurnModel<B: Backend>: Send + Sync {
    /// Run forward pass on a `[1, 3, height, width]` tensor scaled to `[0, 1]`.
    fn forward(&self, input: Tensor<B, 4>) -> Vec<BurnPrediction>;

    /// Expected input size (channels, height, width).
    fn input_size(&self) -> (u32, u32, u32) {
        (3, 640, 640) // Default YOLO input size
    }

    /// Whether bbox output is `[cx, cy, w, h]` (vs corners).
    fn bbox_is_xywh(&self) -> bool {
        true
    }
}

/// A [`BurnModel`] exposed as an [`InferenceModel`].
pub struct BurnDetector<B: Backend, M: BurnModel<B>> {
    variant: String,
    model: M,
    device: B::Device,
    _backend: PhantomData<fn() -> B>,
}

impl<B: Backend, M: BurnModel<B>> BurnDetector<B, M> {
    pub fn new(variant: impl Into<String>, model: M, device: B::Device) -> Self {
        Self {
            variant: variant.into(),
            model,
            device,
            _backend: PhantomData,
        }
    }

    /// Resize the frame to the model input and convert HWC bytes to a CHW
    /// tensor in `[0, 1]`.
    pub fn preprocess(&self, frame: &Frame) -> Result<Tensor<B, 4>> {
        let (channels, target_h, target_w) = self.model.input_size();
        if channels != 3 {
            return Err(Error::inference(format!(
                "model expects {channels} channels; only RGB input is supported"
            )));
        }
        let image = frame
            .to_rgb_image()
            .ok_or_else(|| Error::inference(format!("{}-channel frame", frame.channels())))?;
        let image = if image.dimensions() == (target_w, target_h) {
            image
        } else {
            imageops::resize(&image, target_w, target_h, FilterType::Triangle)
        };

        let (w, h) = (target_w as usize, target_h as usize);
        let mut data = vec![0.0f32; 3 * h * w];
        for (x, y, pixel) in image.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            for c in 0..3 {
                data[c * h * w + y * w + x] = pixel[c] as f32 / 255.0;
            }
        }

        Ok(Tensor::<B, 1>::from_floats(data.as_slice(), &self.device).reshape([1, 3, h, w]))
    }

    /// Map predictions back to frame coordinates.
    fn postprocess(&self, frame: &Frame, predictions: Vec<BurnPrediction>) -> Vec<RawDetection> {
        let (_, target_h, target_w) = self.model.input_size();
        let sx = frame.width() as f32 / target_w as f32;
        let sy = frame.height() as f32 / target_h as f32;

        predictions
            .into_iter()
            .map(|p| {
                let [a, b, c, d] = p.bbox;
                let rect = if self.model.bbox_is_xywh() {
                    Rect::new((a - c / 2.0) * sx, (b - d / 2.0) * sy, c * sx, d * sy)
                } else {
                    Rect::from_ltrb(a * sx, b * sy, c * sx, d * sy)
                };
                RawDetection::new(rect, p.score, p.class_id.unwrap_or(PERSON_CLASS_ID))
            })
            .collect()
    }
}

impl<B: Backend, M: BurnModel<B>> InferenceModel for BurnDetector<B, M> {
    fn variant(&self) -> &str {
        &self.variant
    }

    fn infer(&self, frame: &Frame) -> Result<Vec<RawDetection>> {
        let tensor = self.preprocess(frame)?;
        let predictions = self.model.forward(tensor);
        Ok(self.postprocess(frame, predictions))
    }
}
