//! Per-frame pedestrian detection: class filter, confidence threshold and NMS.

use crate::error::Result;
use crate::integration::Frame;
use crate::tracker::{Detection, ObjectClass, Rect, iou_batch};

/// COCO class index of "person".
pub const PERSON_CLASS_ID: usize = ObjectClass::Person.coco_id();

/// Candidate box straight out of a model, before filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDetection {
    /// Box in TLWH pixel coordinates of the input frame
    pub bbox: Rect,
    pub score: f32,
    pub class_id: usize,
}

impl RawDetection {
    pub fn new(bbox: Rect, score: f32, class_id: usize) -> Self {
        Self {
            bbox,
            score,
            class_id,
        }
    }

    pub fn person(bbox: Rect, score: f32) -> Self {
        Self::new(bbox, score, PERSON_CLASS_ID)
    }
}

/// An object detection model.
///
/// Implementations must be usable from several threads at once; the pipeline
/// shares one loaded model between streams and never holds a lock while
/// `infer` runs.
pub trait InferenceModel: Send + Sync {
    /// Identifier of the loaded model, e.g. `"yolov8s"`.
    fn variant(&self) -> &str;

    /// Run the model on a frame and return all candidates, in any class.
    fn infer(&self, frame: &Frame) -> Result<Vec<RawDetection>>;
}

/// Thresholds used by a single [`detect`] call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionParams {
    pub confidence_threshold: f32,
    pub nms_iou_threshold: f32,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.65,
            nms_iou_threshold: 0.45,
        }
    }
}

/// Detect pedestrians in `frame`.
///
/// Without a model the result is an empty list, not an error. Boxes are
/// clipped to the frame, and anything that is not a person, scores below the
/// confidence threshold or has no area left is dropped before NMS.
pub fn detect(
    frame: &Frame,
    params: &DetectionParams,
    model: Option<&dyn InferenceModel>,
) -> Result<Vec<Detection>> {
    let Some(model) = model else {
        return Ok(Vec::new());
    };

    let (width, height) = (frame.width() as f32, frame.height() as f32);
    let candidates: Vec<(Rect, f32)> = model
        .infer(frame)?
        .into_iter()
        .filter(|raw| raw.class_id == PERSON_CLASS_ID)
        .filter(|raw| raw.score.is_finite() && raw.score >= params.confidence_threshold)
        .map(|raw| (raw.bbox.clip(width, height), raw.score.min(1.0)))
        .filter(|(bbox, _)| !bbox.is_degenerate())
        .collect();

    let boxes: Vec<Rect> = candidates.iter().map(|c| c.0).collect();
    let scores: Vec<f32> = candidates.iter().map(|c| c.1).collect();

    Ok(non_max_suppression(&boxes, &scores, params.nms_iou_threshold)
        .into_iter()
        .map(|i| Detection::new(boxes[i], scores[i]))
        .collect())
}

/// Greedy non-maximum suppression.
///
/// Boxes are visited by descending score; on equal scores the lower index
/// comes first. A box is dropped when its IoU with an already kept box exceeds
/// `iou_threshold`. Returns the kept indices in visiting order.
pub fn non_max_suppression(boxes: &[Rect], scores: &[f32], iou_threshold: f32) -> Vec<usize> {
    let mut order: Vec<usize> = (0..boxes.len().min(scores.len())).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    let ious = iou_batch(boxes, boxes);
    let mut suppressed = vec![false; boxes.len()];
    let mut keep = Vec::new();

    for (pos, &i) in order.iter().enumerate() {
        if suppressed[i] {
            continue;
        }
        keep.push(i);
        for &j in &order[pos + 1..] {
            if ious[[i, j]] > iou_threshold {
                suppressed[j] = true;
            }
        }
    }
    keep
}
