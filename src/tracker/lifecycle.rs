//! Track lifecycle transitions.
//!
//! ```text
//! Tentative --(n_init consecutive hits)--> Confirmed
//! Tentative --(any miss)-----------------> Deleted
//! Confirmed --(time_since_update > max_age)--> Deleted
//! ```

use crate::tracker::association::Association;
use crate::tracker::kalman_filter::KalmanFilter;
use crate::tracker::matching::Detection;
use crate::tracker::track_state::TrackState;
use crate::tracker::track_store::TrackStore;

/// Ids whose state changed while applying one frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LifecycleEvents {
    pub spawned: Vec<u64>,
    pub confirmed: Vec<u64>,
    pub deleted: Vec<u64>,
}

#[derive(Debug, Clone)]
pub struct LifecycleManager {
    pub n_init: u32,
    pub max_age: u32,
}

impl LifecycleManager {
    pub fn new(n_init: u32, max_age: u32) -> Self {
        Self { n_init, max_age }
    }

    /// Apply an association result to the store: update matched tracks, age
    /// unmatched ones, spawn tracks for unmatched detections and purge the dead.
    pub fn apply(
        &self,
        store: &mut TrackStore,
        association: &Association,
        detections: &[Detection],
        kalman_filter: &KalmanFilter,
    ) -> LifecycleEvents {
        let mut events = LifecycleEvents::default();

        for &(track_id, det_idx) in &association.matches {
            let (Some(track), Some(detection)) = (store.get_mut(track_id), detections.get(det_idx))
            else {
                continue;
            };
            let was_tentative = track.is_tentative();
            track.update(detection, kalman_filter, self.n_init);
            if was_tentative && track.is_confirmed() {
                events.confirmed.push(track_id);
            }
        }

        for &track_id in &association.unmatched_tracks {
            if let Some(track) = store.get_mut(track_id) {
                track.mark_missed(self.max_age);
            }
        }

        for &det_idx in &association.unmatched_detections {
            let Some(detection) = detections.get(det_idx) else {
                continue;
            };
            let track_id = store.spawn(detection, kalman_filter);
            events.spawned.push(track_id);
            if self.n_init <= 1
                && let Some(track) = store.get_mut(track_id)
            {
                track.state = TrackState::Confirmed;
                events.confirmed.push(track_id);
            }
        }

        events.deleted = store.purge_deleted();

        if !events.confirmed.is_empty() || !events.deleted.is_empty() {
            log::debug!(
                "lifecycle: spawned={:?} confirmed={:?} deleted={:?}",
                events.spawned,
                events.confirmed,
                events.deleted
            );
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::rect::Rect;

    fn detection() -> Detection {
        Detection::new(Rect::new(10.0, 10.0, 40.0, 100.0), 0.9)
    }

    #[test]
    fn test_unmatched_detection_spawns_tentative_track() {
        let kf = KalmanFilter::new();
        let mut store = TrackStore::new(None);
        let association = Association {
            unmatched_detections: vec![0],
            ..Default::default()
        };
        let events = LifecycleManager::new(3, 70).apply(&mut store, &association, &[detection()], &kf);

        assert_eq!(events.spawned, vec![1]);
        let track = store.get(1).unwrap();
        assert!(track.is_tentative());
        assert_eq!(track.hits, 1);
        assert_eq!(track.age, 0);
    }

    #[test]
    fn test_single_hit_confirmation() {
        let kf = KalmanFilter::new();
        let mut store = TrackStore::new(None);
        let association = Association {
            unmatched_detections: vec![0],
            ..Default::default()
        };
        let events = LifecycleManager::new(1, 70).apply(&mut store, &association, &[detection()], &kf);
        assert_eq!(events.confirmed, vec![1]);
        assert_eq!(store.confirmed().count(), 1);
    }

    #[test]
    fn test_missed_tentative_is_purged() {
        let kf = KalmanFilter::new();
        let mut store = TrackStore::new(None);
        let id = store.spawn(&detection(), &kf);
        store.predict_all(&kf);

        let association = Association {
            unmatched_tracks: vec![id],
            ..Default::default()
        };
        let events = LifecycleManager::new(3, 70).apply(&mut store, &association, &[], &kf);
        assert_eq!(events.deleted, vec![id]);
        assert!(store.is_empty());
    }

    #[test]
    fn test_match_promotes_after_n_init() {
        let kf = KalmanFilter::new();
        let mut store = TrackStore::new(None);
        let id = store.spawn(&detection(), &kf);
        let manager = LifecycleManager::new(3, 70);
        let association = Association {
            matches: vec![(id, 0)],
            ..Default::default()
        };

        store.predict_all(&kf);
        let events = manager.apply(&mut store, &association, &[detection()], &kf);
        assert!(events.confirmed.is_empty());

        store.predict_all(&kf);
        let events = manager.apply(&mut store, &association, &[detection()], &kf);
        assert_eq!(events.confirmed, vec![id]);
    }
}
