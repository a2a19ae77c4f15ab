//! A single tracked pedestrian.

use ndarray::{Array1, Array2};
use serde::Serialize;

use crate::tracker::kalman_filter::KalmanFilter;
use crate::tracker::matching::Detection;
use crate::tracker::nn_matching::FeatureGallery;
use crate::tracker::rect::Rect;
use crate::tracker::track_state::TrackState;

/// Hands out track ids for one track store. Ids start at 1 and are never reused.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next: u64,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl IdAllocator {
    pub fn next_id(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }

    /// Number of ids handed out so far.
    pub fn issued(&self) -> u64 {
        self.next - 1
    }
}

/// Live track with its motion and appearance state.
#[derive(Debug, Clone)]
pub struct Track {
    /// Unique id within the owning track store
    pub track_id: u64,
    pub state: TrackState,
    /// Number of matched frames since creation (creation counts as one)
    pub hits: u32,
    /// Frames since creation
    pub age: u32,
    /// Frames since the last successful match
    pub time_since_update: u32,
    /// Confidence of the last matched detection
    pub confidence: f32,
    /// Kalman state mean over (cx, cy, a, h, vx, vy, va, vh)
    pub mean: Array1<f64>,
    /// Kalman state covariance (8x8)
    pub covariance: Array2<f64>,
    /// Appearance descriptors of matched detections
    pub features: FeatureGallery,
}

impl Track {
    /// Start a tentative track from an unmatched detection.
    pub fn new(
        track_id: u64,
        detection: &Detection,
        kalman_filter: &KalmanFilter,
        nn_budget: Option<usize>,
    ) -> Self {
        let (mean, covariance) = kalman_filter.initiate(detection.bbox.to_xyah());
        let mut features = FeatureGallery::new(nn_budget);
        if let Some(feature) = &detection.feature {
            features.push(feature);
        }

        Self {
            track_id,
            state: TrackState::Tentative,
            hits: 1,
            age: 0,
            time_since_update: 0,
            confidence: detection.confidence,
            mean,
            covariance,
            features,
        }
    }

    /// Current box estimate from the motion state.
    pub fn bbox(&self) -> Rect {
        Rect::from_xyah(
            self.mean[0] as f32,
            self.mean[1] as f32,
            self.mean[2] as f32,
            self.mean[3] as f32,
        )
    }

    pub fn is_tentative(&self) -> bool {
        self.state == TrackState::Tentative
    }

    pub fn is_confirmed(&self) -> bool {
        self.state == TrackState::Confirmed
    }

    pub fn is_deleted(&self) -> bool {
        self.state == TrackState::Deleted
    }

    /// Advance the motion state by one frame.
    pub fn predict(&mut self, kalman_filter: &KalmanFilter) {
        let (mean, covariance) = kalman_filter.predict(&self.mean, &self.covariance);
        self.mean = mean;
        self.covariance = covariance;
        self.age += 1;
        self.time_since_update += 1;
    }

    /// Apply a matched detection: correct the motion state and record the hit.
    ///
    /// A tentative track is confirmed once `n_init` hits have accumulated.
    pub fn update(&mut self, detection: &Detection, kalman_filter: &KalmanFilter, n_init: u32) {
        if let Some((mean, covariance)) =
            kalman_filter.update(&self.mean, &self.covariance, detection.bbox.to_xyah())
        {
            self.mean = mean;
            self.covariance = covariance;
        }
        if let Some(feature) = &detection.feature {
            self.features.push(feature);
        }

        self.confidence = detection.confidence;
        self.hits += 1;
        self.time_since_update = 0;
        if self.is_tentative() && self.hits >= n_init {
            self.state = TrackState::Confirmed;
        }
    }

    /// Record a frame without a match.
    ///
    /// Tentative tracks die on the first miss; confirmed tracks once they have
    /// gone unmatched for more than `max_age` frames.
    pub fn mark_missed(&mut self, max_age: u32) {
        if self.is_tentative() || self.time_since_update > max_age {
            self.state = TrackState::Deleted;
        }
    }

    pub fn snapshot(&self) -> TrackSnapshot {
        TrackSnapshot {
            track_id: self.track_id,
            bbox: self.bbox(),
            confidence: self.confidence,
            age: self.age,
            hits: self.hits,
            time_since_update: self.time_since_update,
        }
    }
}

/// Read-only view of a confirmed track handed to consumers.
///
/// `bbox` is TLWH (`[x, y, width, height]`); use [`TrackSnapshot::ltrb`] for
/// corner coordinates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackSnapshot {
    pub track_id: u64,
    pub bbox: Rect,
    /// Confidence of the detection that last updated the track
    pub confidence: f32,
    pub age: u32,
    pub hits: u32,
    pub time_since_update: u32,
}

impl TrackSnapshot {
    /// Box as `[left, top, right, bottom]`.
    pub fn ltrb(&self) -> [f32; 4] {
        self.bbox.to_ltrb()
    }
}
