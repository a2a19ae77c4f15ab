//! DeepSORT-style multi-object tracker.

use crate::error::{Error, Result};
use crate::tracker::association::{Association, Associator};
use crate::tracker::kalman_filter::KalmanFilter;
use crate::tracker::lifecycle::LifecycleManager;
use crate::tracker::matching::Detection;
use crate::tracker::track::TrackSnapshot;
use crate::tracker::track_store::TrackStore;

/// Configuration for the [`DeepSortTracker`].
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    /// Frames a confirmed track may go unmatched before it is deleted
    pub max_age: u32,
    /// Consecutive hits needed to confirm a tentative track
    pub n_init: u32,
    /// Largest `1 - IoU` accepted in the geometric stage
    pub max_iou_distance: f32,
    /// Largest cosine distance accepted in the appearance stage
    pub max_cosine_distance: f32,
    /// Appearance samples kept per track (`None` keeps all)
    pub nn_budget: Option<usize>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_age: 70,
            n_init: 3,
            max_iou_distance: 0.7,
            max_cosine_distance: 0.4,
            nn_budget: Some(100),
        }
    }
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.n_init == 0 {
            return Err(Error::TrackerUnavailable("n_init must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.max_iou_distance) {
            return Err(Error::TrackerUnavailable(format!(
                "max_iou_distance {} outside [0, 1]",
                self.max_iou_distance
            )));
        }
        if !(0.0..=2.0).contains(&self.max_cosine_distance) {
            return Err(Error::TrackerUnavailable(format!(
                "max_cosine_distance {} outside [0, 2]",
                self.max_cosine_distance
            )));
        }
        if self.nn_budget == Some(0) {
            return Err(Error::TrackerUnavailable("nn_budget must be positive".into()));
        }
        Ok(())
    }
}

/// Motion + appearance tracker for one stream.
///
/// Each [`update`](DeepSortTracker::update) predicts all tracks, associates
/// the frame's detections and applies the lifecycle rules. Only confirmed
/// tracks are returned.
#[derive(Debug, Clone)]
pub struct DeepSortTracker {
    store: TrackStore,
    associator: Associator,
    lifecycle: LifecycleManager,
    kalman_filter: KalmanFilter,
    frame_id: u64,
}

impl DeepSortTracker {
    pub fn new(config: TrackerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store: TrackStore::new(config.nn_budget),
            associator: Associator::new(
                config.max_cosine_distance,
                config.max_iou_distance,
                config.max_age,
            ),
            lifecycle: LifecycleManager::new(config.n_init, config.max_age),
            kalman_filter: KalmanFilter::default(),
            frame_id: 0,
        })
    }

    /// Process one frame of detections and return the confirmed tracks in
    /// creation order.
    pub fn update(&mut self, detections: &[Detection]) -> Vec<TrackSnapshot> {
        self.frame_id += 1;

        self.store.predict_all(&self.kalman_filter);
        let association = self.match_detections(detections);
        self.lifecycle
            .apply(&mut self.store, &association, detections, &self.kalman_filter);

        log::debug!(
            "frame {}: {} detections, {} matched, {} live tracks",
            self.frame_id,
            detections.len(),
            association.matches.len(),
            self.store.len()
        );

        self.store.confirmed().map(|t| t.snapshot()).collect()
    }

    /// Associate detections with the current (already predicted) tracks.
    pub fn match_detections(&self, detections: &[Detection]) -> Association {
        self.associator
            .associate(self.store.tracks(), detections, &self.kalman_filter)
    }

    pub fn store(&self) -> &TrackStore {
        &self.store
    }

    /// Number of frames processed so far.
    pub fn frame_id(&self) -> u64 {
        self.frame_id
    }
}
