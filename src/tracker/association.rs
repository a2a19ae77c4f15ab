//! Two-stage association of detections to tracks.
//!
//! Stage 1 is a matching cascade on appearance: confirmed tracks that carry
//! descriptors are matched by nearest-neighbour cosine distance, most recently
//! updated tracks first, with a Mahalanobis gate on the motion state.
//! Stage 2 matches everything left over by IoU against the predicted boxes.

use crate::tracker::kalman_filter::KalmanFilter;
use crate::tracker::matching::{self, Detection, gated_appearance_distance, iou_distance};
use crate::tracker::rect::Rect;
use crate::tracker::track::Track;

/// Outcome of associating one frame's detections with the live tracks.
///
/// The matched detection indices together with `unmatched_detections` cover
/// every detection exactly once; likewise for track ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Association {
    /// `(track_id, detection index)` pairs
    pub matches: Vec<(u64, usize)>,
    pub unmatched_tracks: Vec<u64>,
    pub unmatched_detections: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct Associator {
    pub max_cosine_distance: f32,
    pub max_iou_distance: f32,
    /// Number of cascade levels, one per frame of `time_since_update`.
    pub cascade_depth: u32,
}

impl Associator {
    pub fn new(max_cosine_distance: f32, max_iou_distance: f32, cascade_depth: u32) -> Self {
        Self {
            max_cosine_distance,
            max_iou_distance,
            cascade_depth,
        }
    }

    /// Match `detections` to `tracks`. Tracks must already be predicted to the
    /// current frame.
    pub fn associate(
        &self,
        tracks: &[Track],
        detections: &[Detection],
        kalman_filter: &KalmanFilter,
    ) -> Association {
        let mut track_matched = vec![false; tracks.len()];
        let mut det_matched = vec![false; detections.len()];
        let mut matches: Vec<(usize, usize)> = Vec::new();

        for (t, d) in self.appearance_cascade(tracks, detections, kalman_filter) {
            track_matched[t] = true;
            det_matched[d] = true;
            matches.push((t, d));
        }

        let iou_tracks: Vec<usize> = (0..tracks.len()).filter(|&t| !track_matched[t]).collect();
        let iou_dets: Vec<usize> = (0..detections.len()).filter(|&d| !det_matched[d]).collect();

        let track_boxes: Vec<Rect> = iou_tracks.iter().map(|&t| tracks[t].bbox()).collect();
        let det_boxes: Vec<Rect> = iou_dets.iter().map(|&d| detections[d].bbox).collect();
        let cost = iou_distance(&track_boxes, &det_boxes);
        let result = matching::linear_assignment(&cost, self.max_iou_distance);

        for (r, c) in result.matches {
            let (t, d) = (iou_tracks[r], iou_dets[c]);
            track_matched[t] = true;
            det_matched[d] = true;
            matches.push((t, d));
        }

        Association {
            matches: matches
                .into_iter()
                .map(|(t, d)| (tracks[t].track_id, d))
                .collect(),
            unmatched_tracks: (0..tracks.len())
                .filter(|&t| !track_matched[t])
                .map(|t| tracks[t].track_id)
                .collect(),
            unmatched_detections: (0..detections.len()).filter(|&d| !det_matched[d]).collect(),
        }
    }

    /// Appearance matching cascade. Returns `(track index, detection index)` pairs.
    fn appearance_cascade(
        &self,
        tracks: &[Track],
        detections: &[Detection],
        kalman_filter: &KalmanFilter,
    ) -> Vec<(usize, usize)> {
        let candidates: Vec<usize> = (0..tracks.len())
            .filter(|&t| tracks[t].is_confirmed() && !tracks[t].features.is_empty())
            .collect();
        let mut remaining: Vec<usize> = (0..detections.len())
            .filter(|&d| detections[d].feature.is_some())
            .collect();

        let mut matches = Vec::new();
        if candidates.is_empty() {
            return matches;
        }

        for level in 0..self.cascade_depth {
            if remaining.is_empty() {
                break;
            }
            let level_tracks: Vec<usize> = candidates
                .iter()
                .copied()
                .filter(|&t| tracks[t].time_since_update == level + 1)
                .collect();
            if level_tracks.is_empty() {
                continue;
            }

            let track_refs: Vec<&Track> = level_tracks.iter().map(|&t| &tracks[t]).collect();
            let det_refs: Vec<&Detection> = remaining.iter().map(|&d| &detections[d]).collect();
            let cost = gated_appearance_distance(&track_refs, &det_refs, kalman_filter);
            let result = matching::linear_assignment(&cost, self.max_cosine_distance);

            for &(r, c) in &result.matches {
                matches.push((level_tracks[r], remaining[c]));
            }
            remaining = result
                .unmatched_detections
                .iter()
                .map(|&c| remaining[c])
                .collect();
        }
        matches
    }
}
