//! Degraded tracking used when the real tracker cannot be built.

use std::collections::HashMap;

use crate::tracker::{Detection, IdAllocator, TrackSnapshot};

/// Assigns ids without motion or appearance state.
///
/// A detection whose box, rounded to whole pixels, equals one from the
/// previous frame keeps that box's id; everything else gets a fresh one.
#[derive(Debug, Clone, Default)]
pub struct PassthroughTracker {
    ids: IdAllocator,
    previous: HashMap<[i32; 4], u64>,
}

impl PassthroughTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, detections: &[Detection]) -> Vec<TrackSnapshot> {
        let mut current = HashMap::with_capacity(detections.len());
        let snapshots = detections
            .iter()
            .map(|det| {
                let key = rounded(det);
                let track_id = match current.get(&key) {
                    // Two identical boxes in one frame still get distinct ids.
                    Some(_) => self.ids.next_id(),
                    None => self
                        .previous
                        .get(&key)
                        .copied()
                        .unwrap_or_else(|| self.ids.next_id()),
                };
                current.entry(key).or_insert(track_id);
                TrackSnapshot {
                    track_id,
                    bbox: det.bbox,
                    confidence: det.confidence,
                    age: 1,
                    hits: 1,
                    time_since_update: 0,
                }
            })
            .collect();
        self.previous = current;
        snapshots
    }

    /// Boxes remembered from the last frame.
    pub fn len(&self) -> usize {
        self.previous.len()
    }

    pub fn is_empty(&self) -> bool {
        self.previous.is_empty()
    }
}

fn rounded(det: &Detection) -> [i32; 4] {
    det.bbox.to_tlwh().map(|v| v.round() as i32)
}
