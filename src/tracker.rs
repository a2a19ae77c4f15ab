//! Multi-object tracking: motion model, association and track lifecycle.

mod association;
mod deep_sort;
mod kalman_filter;
mod lifecycle;
mod matching;
mod nn_matching;
mod rect;
mod track;
mod track_state;
mod track_store;

pub use association::{Association, Associator};
pub use deep_sort::{DeepSortTracker, TrackerConfig};
pub use kalman_filter::{CHI2_GATE_4DOF, KalmanFilter};
pub use lifecycle::{LifecycleEvents, LifecycleManager};
pub use matching::{AssignmentResult, Detection, INFTY_COST, ObjectClass, linear_assignment};
pub use nn_matching::{FeatureGallery, cosine_distance, normalize};
pub use rect::{Rect, iou_batch};
pub use track::{IdAllocator, Track, TrackSnapshot};
pub use track_state::TrackState;
pub use track_store::TrackStore;
