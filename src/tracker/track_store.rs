//! Owner of the live tracks of one stream.

use crate::tracker::kalman_filter::KalmanFilter;
use crate::tracker::matching::Detection;
use crate::tracker::track::{IdAllocator, Track};

/// Live tracks (tentative and confirmed) in creation order, plus the id
/// allocator that keeps ids unique for the lifetime of the store.
#[derive(Debug, Clone, Default)]
pub struct TrackStore {
    tracks: Vec<Track>,
    ids: IdAllocator,
    nn_budget: Option<usize>,
}

impl TrackStore {
    pub fn new(nn_budget: Option<usize>) -> Self {
        Self {
            tracks: Vec::new(),
            ids: IdAllocator::default(),
            nn_budget,
        }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, track_id: u64) -> Option<&Track> {
        self.tracks.iter().find(|t| t.track_id == track_id)
    }

    pub fn get_mut(&mut self, track_id: u64) -> Option<&mut Track> {
        self.tracks.iter_mut().find(|t| t.track_id == track_id)
    }

    /// Total number of tracks ever created by this store.
    pub fn created(&self) -> u64 {
        self.ids.issued()
    }

    /// Run the motion model of every track one frame ahead.
    pub fn predict_all(&mut self, kalman_filter: &KalmanFilter) {
        for track in &mut self.tracks {
            track.predict(kalman_filter);
        }
    }

    /// Create a tentative track for `detection` and return its id.
    pub fn spawn(&mut self, detection: &Detection, kalman_filter: &KalmanFilter) -> u64 {
        let track_id = self.ids.next_id();
        self.tracks
            .push(Track::new(track_id, detection, kalman_filter, self.nn_budget));
        track_id
    }

    /// Drop deleted tracks and return their ids.
    pub fn purge_deleted(&mut self) -> Vec<u64> {
        let mut removed = Vec::new();
        self.tracks.retain(|t| {
            if t.is_deleted() {
                removed.push(t.track_id);
                false
            } else {
                true
            }
        });
        removed
    }

    pub fn confirmed(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter().filter(|t| t.is_confirmed())
    }
}
