use serde::Serialize;

/// Lifecycle state of a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackState {
    /// Newly created, waiting for enough consecutive hits
    #[default]
    Tentative,
    /// Confirmed identity, visible to consumers
    Confirmed,
    /// Scheduled for removal from the track store
    Deleted,
}
