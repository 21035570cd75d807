//! # PetalSonic Studio
//!
//! Lifecycle-correct event, bus and emitter management for games that drive
//! FMOD Studio style audio middleware.
//!
//! The native runtime stays behind the [`AudioEngineHandle`] trait. On top of
//! it, the [`AudioDirector`] owns every live [`EventInstance`], the mixer
//! [`BusControl`]s and global parameters, while [`SpatialEmitter`]s keep
//! instances glued to moving world transforms. [`StudioWorld`] bundles both
//! behind a single per-frame [`advance`](StudioWorld::advance) call.
//!
//! ## Quick Start
//!
//! ```
//! use petalsonic_studio::*;
//! use std::sync::Arc;
//!
//! // Any AudioEngineHandle works; HeadlessEngine needs no audio device.
//! let engine = Arc::new(HeadlessEngine::new());
//! let mut world = StudioWorld::new(StudioDesc::default().bank("Master.bank"), engine);
//! world.initialize()?;
//!
//! // Fire an event and keep its id around
//! let music = world.director_mut().play_event("event:/Music/MainTheme")?;
//! world.director_mut().set_bus_volume("bus:/Music", 0.8)?;
//!
//! // Attach a looping sound to a moving object
//! let engine_hum = world.add_emitter(EmitterConfig::volumetric("event:/SFX/Engine").auto_play(true));
//! world.set_emitter_position(engine_hum, Vec3::new(0.0, 0.0, -3.0))?;
//!
//! // Once per frame
//! world.advance(1.0 / 60.0);
//!
//! for event in world.director().poll_events() {
//!     if let StudioEvent::InstanceCompleted { path, .. } = event {
//!         println!("finished: {}", path);
//!     }
//! }
//!
//! world.director_mut().stop_event_instance(music, false);
//! # Ok::<(), StudioError>(())
//! ```
//!
//! ## Key Components
//!
//! - **[`AudioDirector`]**: Starts/stops events, owns the active registry, buses, global parameters
//! - **[`EventInstance`]**: Playback, parameter and 3D state of one event occurrence
//! - **[`BusControl`]**: Volume, mute and pause of one mixer bus
//! - **[`SpatialEmitter`]**: Drives an instance's position and velocity from a world transform
//! - **[`StudioWorld`]**: Owns director and emitters; the per-frame entry point
//! - **[`AudioEngineHandle`]**: Boundary to the native runtime; [`HeadlessEngine`] is an in-memory one
//! - **[`StudioEvent`]**: Lifecycle notifications drained with [`AudioDirector::poll_events`]
//!
//! ## Error handling
//!
//! A dropped audio cue must never take the game down. Misuse and engine
//! failures are logged through the `log` facade and returned as
//! [`StudioError`]; getters fall back to neutral values. The only failure a
//! host really has to look at is [`StudioError::EngineUnavailable`] from
//! [`AudioDirector::initialize`].

pub mod config;
pub mod director;
pub mod emitter;
pub mod engine;
pub mod error;
pub mod events;
pub mod math;
pub mod mixer;
pub mod playback;
pub mod world;

pub use config::{EmitterConfig, EmitterSpace, SpeakerMode, StudioDesc};
pub use director::{AudioDirector, DirectorState};
pub use emitter::SpatialEmitter;
pub use engine::{
    AudioEngineHandle, EventHandle, HeadlessEngine, ListenerAttributes, PlayCommand, SystemConfig,
};
pub use error::StudioError;
pub use events::StudioEvent;
pub use math::{Pose, Quat, Vec2, Vec3};
pub use mixer::{BusControl, MASTER_BUS};
pub use playback::{EventInstance, InstanceId, PlayState};
pub use world::{EmitterId, StudioWorld};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn setup() -> (Arc<HeadlessEngine>, StudioWorld) {
        init_logger();
        let engine = Arc::new(HeadlessEngine::new());
        let mut world = StudioWorld::new(StudioDesc::default(), engine.clone());
        world.initialize().expect("Failed to initialize world");
        (engine, world)
    }

    #[test]
    fn test_music_lifecycle() {
        let (engine, mut world) = setup();

        let music = world
            .director_mut()
            .play_event("event:/Music")
            .expect("Failed to play music");
        assert_eq!(
            world.director().instance(music).unwrap().state(),
            PlayState::Playing
        );

        let instance = world.director_mut().instance_mut(music).unwrap();
        instance.pause().unwrap();
        assert_eq!(instance.state(), PlayState::Paused);
        instance.resume().unwrap();
        assert_eq!(instance.state(), PlayState::Playing);
        instance.stop(false).unwrap();
        assert_eq!(instance.state(), PlayState::Stopped);

        // Still registered until the next sweep.
        assert!(world.director().instance(music).is_some());
        world.advance(1.0 / 60.0);
        assert!(world.director().instance(music).is_none());
        assert_eq!(engine.live_event_count(), 0);
    }

    #[test]
    fn test_bulk_stop_of_shared_path() {
        let (_engine, mut world) = setup();
        let director = world.director_mut();

        let first = director.play_event("event:/SFX/Hit").unwrap();
        let second = director.play_event("event:/SFX/Hit").unwrap();
        assert_ne!(first, second);

        let before = director.active_instance_count();
        assert_eq!(director.stop_event("event:/SFX/Hit", true), 2);
        assert_eq!(director.active_instance_count(), before - 2);
        assert!(director.instances_with_path("event:/SFX/Hit").is_empty());
    }

    #[test]
    fn test_emitter_velocity_follows_motion() {
        let (engine, mut world) = setup();
        let emitter = world.add_emitter_at(
            EmitterConfig::volumetric("event:/SFX/Engine"),
            Vec3::ZERO,
        );
        let instance_id = world.play_emitter(emitter).unwrap();
        let handle = world
            .director()
            .instance(instance_id)
            .unwrap()
            .handle()
            .unwrap();

        world
            .set_emitter_position(emitter, Vec3::new(2.0, 0.0, 0.0))
            .unwrap();
        world.advance(1.0);
        let native = engine.event_snapshot(handle).unwrap();
        assert_eq!(native.position, Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(native.velocity, Vec3::new(2.0, 0.0, 0.0));

        world.advance(1.0);
        let native = engine.event_snapshot(handle).unwrap();
        assert_eq!(native.velocity, Vec3::ZERO);
    }

    #[test]
    fn test_uninitialized_play_leaves_registry_alone() {
        init_logger();
        let engine = Arc::new(HeadlessEngine::new());
        let mut director = AudioDirector::new(StudioDesc::default(), engine);

        assert!(director.play_event("event:/Music").is_err());
        assert_eq!(director.active_instance_count(), 0);
    }

    #[test]
    fn test_running_without_audio() {
        init_logger();
        let engine = Arc::new(HeadlessEngine::new());
        engine.set_available(false);
        let mut world = StudioWorld::new(StudioDesc::default(), engine);

        let err = world.initialize().unwrap_err();
        assert!(matches!(err, StudioError::EngineUnavailable(_)));

        // The game keeps running; audio calls are harmless no-ops.
        let emitter = world.add_emitter(EmitterConfig::volumetric("event:/SFX/Engine").auto_play(true));
        assert!(!world.is_emitter_playing(emitter));
        assert!(world.director_mut().play_event("event:/Music").is_err());
        assert_eq!(world.advance(1.0 / 60.0), 0);
    }

    #[test]
    fn test_release_twice_matches_once() {
        let (_engine, mut world) = setup();
        let id = world.director_mut().play_event("event:/Music").unwrap();
        let instance = world.director_mut().instance_mut(id).unwrap();

        instance.release().unwrap();
        let once = (instance.state(), instance.is_released());
        assert!(instance.release().is_ok());
        assert_eq!((instance.state(), instance.is_released()), once);
    }
}
