//! Appearance descriptors for detection boxes.

use ndarray::{Array1, ArrayView3, s};

use crate::error::{Error, Result};
use crate::integration::Frame;
use crate::tracker::{Rect, normalize};

/// Computes one descriptor per box.
///
/// Descriptors from one extractor must all have the same length. They need
/// not be normalised; the tracker normalises them before storing.
pub trait AppearanceExtractor: Send {
    fn extract(&mut self, frame: &Frame, boxes: &[Rect]) -> Result<Vec<Array1<f32>>>;
}

/// Colour histogram of the upper and lower half of each box.
///
/// Splitting at mid-height keeps torso and legs apart, which is enough to
/// tell two pedestrians in different clothes apart across short occlusions.
#[derive(Debug, Clone)]
pub struct ColorHistogramExtractor {
    bins: usize,
    max_samples_per_axis: usize,
}

impl Default for ColorHistogramExtractor {
    fn default() -> Self {
        Self {
            bins: 8,
            max_samples_per_axis: 64,
        }
    }
}

impl ColorHistogramExtractor {
    pub fn new(bins: usize) -> Result<Self> {
        if bins == 0 || bins > 256 {
            return Err(Error::Appearance(format!("bins {bins} outside 1..=256")));
        }
        Ok(Self {
            bins,
            ..Default::default()
        })
    }

    /// Length of every descriptor this extractor produces.
    pub fn descriptor_len(&self) -> usize {
        2 * 3 * self.bins
    }

    fn describe(&self, pixels: ArrayView3<'_, u8>) -> Array1<f32> {
        let mut descriptor = Array1::<f32>::zeros(self.descriptor_len());
        let (height, width, channels) = pixels.dim();
        let row_step = (height / self.max_samples_per_axis).max(1);
        let col_step = (width / self.max_samples_per_axis).max(1);
        let half = height.div_ceil(2);

        for row in (0..height).step_by(row_step) {
            let part = usize::from(row >= half);
            for col in (0..width).step_by(col_step) {
                for ch in 0..3 {
                    // Grey frames repeat their single channel; alpha is ignored.
                    let value = pixels[[row, col, ch.min(channels - 1)]] as usize;
                    let bin = value * self.bins / 256;
                    descriptor[(part * 3 + ch) * self.bins + bin] += 1.0;
                }
            }
        }
        normalize(&descriptor)
    }
}

impl AppearanceExtractor for ColorHistogramExtractor {
    fn extract(&mut self, frame: &Frame, boxes: &[Rect]) -> Result<Vec<Array1<f32>>> {
        let pixels = frame.pixels();
        let (frame_w, frame_h) = (frame.width() as usize, frame.height() as usize);

        boxes
            .iter()
            .map(|bbox| {
                if bbox.is_degenerate() {
                    return Err(Error::Appearance(format!("cannot crop {bbox:?}")));
                }
                let left = (bbox.x.floor().max(0.0) as usize).min(frame_w - 1);
                let top = (bbox.y.floor().max(0.0) as usize).min(frame_h - 1);
                let right = (bbox.right().ceil().max(0.0) as usize).clamp(left + 1, frame_w);
                let bottom = (bbox.bottom().ceil().max(0.0) as usize).clamp(top + 1, frame_h);
                Ok(self.describe(pixels.slice(s![top..bottom, left..right, ..])))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crate::tracker::cosine_distance;
    use ndarray::Array3;

    /// Left half red shirt over blue trousers, right half green over black.
    fn two_people() -> Frame {
        let pixels = Array3::from_shape_fn((100, 200, 3), |(row, col, ch)| {
            let colour: [u8; 3] = match (col < 100, row < 50) {
                (true, true) => [220, 20, 20],
                (true, false) => [20, 20, 200],
                (false, true) => [20, 200, 20],
                (false, false) => [10, 10, 10],
            };
            colour[ch]
        });
        Frame::from_array(pixels).unwrap()
    }

    #[test]
    fn test_descriptor_shape_and_norm() {
        let mut extractor = ColorHistogramExtractor::default();
        let features = extractor
            .extract(&two_people(), &[Rect::new(10.0, 0.0, 50.0, 100.0)])
            .unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].len(), extractor.descriptor_len());
        assert_relative_eq!(features[0].dot(&features[0]), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_same_person_is_closer_than_other_person() {
        let mut extractor = ColorHistogramExtractor::default();
        let features = extractor
            .extract(
                &two_people(),
                &[
                    Rect::new(10.0, 0.0, 40.0, 100.0),
                    Rect::new(50.0, 0.0, 40.0, 100.0),
                    Rect::new(120.0, 0.0, 40.0, 100.0),
                ],
            )
            .unwrap();
        let same = cosine_distance(&features[0], &features[1]);
        let other = cosine_distance(&features[0], &features[2]);
        assert!(same < 0.05);
        assert!(other > 0.4);
    }

    #[test]
    fn test_boxes_outside_frame_are_clamped() {
        let mut extractor = ColorHistogramExtractor::default();
        let features = extractor
            .extract(&two_people(), &[Rect::new(190.0, 90.0, 50.0, 50.0)])
            .unwrap();
        assert_eq!(features[0].len(), 48);
    }

    #[test]
    fn test_grey_frame() {
        let frame = Frame::from_raw(4, 4, 1, vec![128; 16]).unwrap();
        let mut extractor = ColorHistogramExtractor::new(4).unwrap();
        let features = extractor.extract(&frame, &[Rect::new(0.0, 0.0, 4.0, 4.0)]).unwrap();
        assert_eq!(features[0].len(), 24);
    }

    #[test]
    fn test_degenerate_box_is_an_error() {
        let mut extractor = ColorHistogramExtractor::default();
        let result = extractor.extract(&two_people(), &[Rect::new(10.0, 10.0, 0.0, 10.0)]);
        assert!(matches!(result, Err(Error::Appearance(_))));
        assert!(ColorHistogramExtractor::new(0).is_err());
    }
}
