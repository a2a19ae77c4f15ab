//! Detections, cost matrices and the linear assignment solver.

use ndarray::{Array1, Array2};
use serde::Serialize;

use crate::tracker::kalman_filter::{CHI2_GATE_4DOF, KalmanFilter};
use crate::tracker::rect::Rect;
use crate::tracker::track::Track;

/// Cost assigned to pairs that must never be matched.
pub const INFTY_COST: f32 = 1e5;

/// Padding cost for the dummy rows/columns of the square assignment problem.
const PADDING_COST: f64 = 1e6;

/// Object class emitted by the detector. Only pedestrians are tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectClass {
    #[default]
    Person,
}

impl ObjectClass {
    /// Index of the class in the COCO label set.
    pub const fn coco_id(self) -> usize {
        match self {
            ObjectClass::Person => 0,
        }
    }
}

/// One pedestrian detection in the current frame.
#[derive(Debug, Clone, Serialize)]
pub struct Detection {
    /// Bounding box in TLWH format
    pub bbox: Rect,
    /// Detector confidence in `[0, 1]`
    pub confidence: f32,
    pub class: ObjectClass,
    /// Appearance descriptor, if an extractor ran on this frame
    #[serde(skip)]
    pub feature: Option<Array1<f32>>,
}

impl Detection {
    pub fn new(bbox: Rect, confidence: f32) -> Self {
        Self {
            bbox,
            confidence,
            class: ObjectClass::Person,
            feature: None,
        }
    }

    pub fn with_feature(mut self, feature: Array1<f32>) -> Self {
        self.feature = Some(feature);
        self
    }
}

/// `1 - IoU` between each track's predicted box and each detection box.
pub fn iou_distance(track_boxes: &[Rect], det_boxes: &[Rect]) -> Array2<f32> {
    Array2::from_shape_fn((track_boxes.len(), det_boxes.len()), |(i, j)| {
        1.0 - track_boxes[i].iou(&det_boxes[j])
    })
}

/// Nearest-neighbour cosine distance between track galleries and detection
/// descriptors, gated by the Mahalanobis distance of the motion state.
///
/// Pairs without a descriptor on either side, or outside the motion gate,
/// get [`INFTY_COST`].
pub fn gated_appearance_distance(
    tracks: &[&Track],
    detections: &[&Detection],
    kalman_filter: &KalmanFilter,
) -> Array2<f32> {
    let measurements: Vec<[f64; 4]> = detections.iter().map(|d| d.bbox.to_xyah()).collect();
    let mut cost = Array2::from_elem((tracks.len(), detections.len()), INFTY_COST);

    for (i, track) in tracks.iter().enumerate() {
        let gating = kalman_filter.gating_distance(&track.mean, &track.covariance, &measurements);
        for (j, det) in detections.iter().enumerate() {
            if gating[j] > CHI2_GATE_4DOF {
                continue;
            }
            let distance = det
                .feature
                .as_ref()
                .and_then(|feature| track.features.distance(feature));
            if let Some(distance) = distance {
                cost[[i, j]] = distance;
            }
        }
    }
    cost
}

#[derive(Debug, Clone, Default)]
pub struct AssignmentResult {
    pub matches: Vec<(usize, usize)>,
    pub unmatched_tracks: Vec<usize>,
    pub unmatched_detections: Vec<usize>,
}

/// Minimum-cost bipartite matching of rows (tracks) to columns (detections).
///
/// Rows and columns without any pair at or below `thresh` cannot match and are
/// left out of the solve. Remaining costs above `thresh` are clamped just past
/// it, and any pair whose original cost exceeds `thresh` is rejected
/// afterwards. An empty problem or a solver failure yields no matches.
pub fn linear_assignment(cost_matrix: &Array2<f32>, thresh: f32) -> AssignmentResult {
    let (num_rows, num_cols) = cost_matrix.dim();
    let feasible = |c: f32| c.is_finite() && c <= thresh;

    let rows: Vec<usize> = (0..num_rows)
        .filter(|&i| (0..num_cols).any(|j| feasible(cost_matrix[[i, j]])))
        .collect();
    let cols: Vec<usize> = (0..num_cols)
        .filter(|&j| (0..num_rows).any(|i| feasible(cost_matrix[[i, j]])))
        .collect();

    let mut matches = vec![];
    let mut matched_rows = vec![false; num_rows];
    let mut matched_cols = vec![false; num_cols];

    if !rows.is_empty() && !cols.is_empty() {
        let size = rows.len().max(cols.len());
        let clamp = thresh as f64 + 1e-5;
        let mut padded = Array2::<f64>::from_elem((size, size), PADDING_COST);
        for (r, &i) in rows.iter().enumerate() {
            for (c, &j) in cols.iter().enumerate() {
                let cost = cost_matrix[[i, j]] as f64;
                padded[[r, c]] = if cost.is_finite() { cost.min(clamp) } else { clamp };
            }
        }

        match lapjv::lapjv(&padded) {
            Ok((row_to_col, _)) => {
                for (r, &c) in row_to_col.iter().enumerate().take(rows.len()) {
                    if c >= cols.len() {
                        continue;
                    }
                    let (i, j) = (rows[r], cols[c]);
                    if feasible(cost_matrix[[i, j]]) {
                        matches.push((i, j));
                        matched_rows[i] = true;
                        matched_cols[j] = true;
                    }
                }
            }
            Err(err) => {
                log::warn!("assignment solver failed ({err:?}); treating frame as unmatched");
            }
        }
    }

    matches.sort_unstable();
    let unmatched_tracks = (0..num_rows).filter(|&i| !matched_rows[i]).collect();
    let unmatched_detections = (0..num_cols).filter(|&j| !matched_cols[j]).collect();

    AssignmentResult {
        matches,
        unmatched_tracks,
        unmatched_detections,
    }
}
