use pedtrack::{DeepSortTracker, Detection, Rect, TrackSnapshot, TrackerConfig};

fn person(x: f32, y: f32) -> Detection {
    Detection::new(Rect::new(x, y, 50.0, 120.0), 0.9)
}

#[test]
fn test_basic_lifecycle() {
    let mut tracker = DeepSortTracker::new(TrackerConfig::default()).unwrap();

    // Frames 1-5: the same person, walking slowly to the right.
    let mut id = None;
    for frame in 1..=5u32 {
        let tracks = tracker.update(&[person(100.0 + frame as f32 * 2.0, 100.0)]);
        if frame < 3 {
            assert!(tracks.is_empty(), "tentative track returned at frame {frame}");
            continue;
        }
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].hits, frame);
        assert_eq!(tracks[0].time_since_update, 0);
        assert_eq!(*id.get_or_insert(tracks[0].track_id), tracks[0].track_id);
    }
    let id = id.unwrap();

    // Frames 6-75: no detections, the confirmed track coasts.
    for frame in 6..=75u32 {
        let tracks = tracker.update(&[]);
        assert_eq!(tracks.len(), 1, "track lost at frame {frame}");
        assert_eq!(tracks[0].track_id, id);
        assert_eq!(tracks[0].time_since_update, frame - 5);
    }

    // Frame 76: time_since_update exceeds max_age.
    assert!(tracker.update(&[]).is_empty());
    assert!(tracker.store().is_empty());
}

#[test]
fn test_reappearance_within_max_age_keeps_id() {
    let mut tracker = DeepSortTracker::new(TrackerConfig::default()).unwrap();
    for _ in 0..4 {
        tracker.update(&[person(200.0, 100.0)]);
    }
    for _ in 0..10 {
        tracker.update(&[]);
    }
    let tracks = tracker.update(&[person(200.0, 100.0)]);
    assert_eq!(tracks.len(), 1);
    assert_eq!(tracks[0].track_id, 1);
    assert_eq!(tracks[0].time_since_update, 0);
}

#[test]
fn test_empty_sequence_yields_no_tracks() {
    let mut tracker = DeepSortTracker::new(TrackerConfig::default()).unwrap();
    for _ in 0..20 {
        assert!(tracker.update(&[]).is_empty());
    }
    assert_eq!(tracker.store().created(), 0);
    assert_eq!(tracker.frame_id(), 20);
}

/// Detections for a short scene: two walkers and a flickering false positive.
fn scene() -> Vec<Vec<Detection>> {
    (0..40)
        .map(|t| {
            let t = t as f32;
            let mut frame = vec![person(50.0 + 3.0 * t, 80.0), person(500.0 - 2.0 * t, 300.0)];
            if (t as u32) % 3 == 0 {
                frame.push(person(300.0, 10.0));
            }
            frame
        })
        .collect()
}

fn run(frames: &[Vec<Detection>]) -> Vec<Vec<TrackSnapshot>> {
    let mut tracker = DeepSortTracker::new(TrackerConfig::default()).unwrap();
    frames.iter().map(|dets| tracker.update(dets)).collect()
}

#[test]
fn test_replay_is_deterministic() {
    let frames = scene();
    assert_eq!(run(&frames), run(&frames));
}

#[test]
fn test_confirmed_tracks_have_n_init_hits() {
    let outputs = run(&scene());
    for tracks in &outputs {
        for track in tracks {
            assert!(track.hits >= 3, "track {} confirmed with {} hits", track.track_id, track.hits);
        }
    }

    let last = outputs.last().unwrap();
    let ids: Vec<u64> = last.iter().map(|t| t.track_id).collect();
    // The flicker spawns tracks but never confirms them.
    assert_eq!(ids, vec![1, 2]);
}

#[test]
fn test_single_hit_confirmation() {
    let config = TrackerConfig {
        n_init: 1,
        ..Default::default()
    };
    let mut tracker = DeepSortTracker::new(config).unwrap();
    let tracks = tracker.update(&[person(10.0, 10.0)]);
    assert_eq!(tracks.len(), 1);
    assert_eq!(tracks[0].hits, 1);
    assert_eq!(tracks[0].age, 0);
}

#[test]
fn test_snapshot_serializes_tlwh() {
    let mut tracker = DeepSortTracker::new(TrackerConfig {
        n_init: 1,
        ..Default::default()
    })
    .unwrap();
    let tracks = tracker.update(&[person(10.0, 20.0)]);
    let json = serde_json::to_value(&tracks[0]).unwrap();
    assert_eq!(json["track_id"], 1);
    assert_eq!(json["bbox"].as_array().map(|b| b.len()), Some(4));
    assert_eq!(tracks[0].ltrb()[2], tracks[0].bbox.x + tracks[0].bbox.width);
}
