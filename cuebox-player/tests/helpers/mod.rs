//! Shared fixtures for the player integration tests
//!
//! Builds a small in-memory catalog, a seeded service on simulated channels,
//! and helpers to step the clock and drain the event bus.

#![allow(dead_code)]

use std::sync::Arc;

use cuebox_common::catalog::{
    Catalog, ClipDescriptor, GroupDescriptor, GroupPlayMode, PlaylistDescriptor, TrackEntry,
};
use cuebox_common::config::AudioSettings;
use cuebox_common::events::AudioEvent;
use cuebox_common::transition::TransitionSpec;
use cuebox_player::channel::SimulatedChannel;
use cuebox_player::AudioService;
use tokio::sync::broadcast::{self, error::TryRecvError};

pub const EPS: f32 = 1e-4;

/// Frame step used by most tests; exact in binary floating point
pub const TICK: f32 = 0.25;

pub fn test_catalog() -> Catalog {
    let mut catalog = Catalog::new();
    catalog.insert_clip(ClipDescriptor::new("click", "sfx/click.wav", 1.0));
    catalog.insert_clip(ClipDescriptor::new("door", "sfx/door.wav", 2.0));
    catalog.insert_clip(ClipDescriptor::new("step_1", "sfx/step_1.wav", 1.0));
    catalog.insert_clip(ClipDescriptor::new("step_2", "sfx/step_2.wav", 1.0));
    catalog.insert_clip(ClipDescriptor::new("rumble", "sfx/rumble.wav", 2.0));
    catalog.insert_clip(
        ClipDescriptor::new("breath", "sfx/breath.wav", 10.0).with_dynamic_start(2.0),
    );
    catalog.insert_clip(ClipDescriptor::new("theme_a", "music/a.ogg", 4.0));
    catalog.insert_clip(ClipDescriptor::new("theme_b", "music/b.ogg", 4.0));

    catalog.insert_group(GroupDescriptor::new(
        "footsteps",
        "Footsteps",
        vec!["step_1".into(), "step_2".into()],
        GroupPlayMode::Random,
    ));
    catalog.insert_group(
        GroupDescriptor::new(
            "footsteps_varied",
            "Footsteps varied",
            vec!["step_1".into(), "step_2".into(), "click".into()],
            GroupPlayMode::Random,
        )
        .with_avoid_repeat(true),
    );
    catalog.insert_group(GroupDescriptor::new(
        "impact",
        "Impact",
        vec!["click".into(), "rumble".into()],
        GroupPlayMode::Combined,
    ));
    catalog.insert_group(GroupDescriptor::new(
        "steps_in_order",
        "Steps in order",
        vec!["step_1".into(), "step_2".into(), "click".into()],
        GroupPlayMode::Sequential,
    ));

    let mut once = PlaylistDescriptor::new(
        "level_once",
        vec![
            TrackEntry::new("theme_a", 0.0, None),
            TrackEntry::new("theme_b", 0.0, None),
        ],
    );
    once.transition = Some(TransitionSpec::cut());
    catalog.insert_playlist(once);

    let mut looping = PlaylistDescriptor::new(
        "level_loop",
        vec![
            TrackEntry::new("theme_a", 0.0, Some(2.0)),
            TrackEntry::new("theme_b", 1.0, Some(3.0)),
        ],
    );
    looping.looping = true;
    looping.transition = Some(TransitionSpec::cut());
    catalog.insert_playlist(looping);

    catalog
}

pub fn test_settings() -> AudioSettings {
    AudioSettings {
        rng_seed: Some(7),
        ..AudioSettings::default()
    }
}

pub fn service_with(settings: AudioSettings) -> AudioService {
    let mut service = AudioService::new(
        Arc::new(test_catalog()),
        settings,
        SimulatedChannel::factory(),
    );
    service.init();
    service
}

pub fn test_service() -> AudioService {
    service_with(test_settings())
}

/// Step the service `seconds` forward in `dt` increments
pub fn run_for(service: &mut AudioService, seconds: f32, dt: f32) {
    let steps = (seconds / dt).round() as usize;
    for _ in 0..steps {
        service.tick(dt);
    }
}

pub fn drain(rx: &mut broadcast::Receiver<AudioEvent>) -> Vec<AudioEvent> {
    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(TryRecvError::Lagged(_)) => continue,
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
        }
    }
    events
}

pub fn names(events: &[AudioEvent]) -> Vec<&'static str> {
    events.iter().map(|e| e.name()).collect()
}

pub fn assert_close(actual: f32, expected: f32) {
    assert!(
        (actual - expected).abs() < 1e-3,
        "expected {expected}, got {actual}"
    );
}
