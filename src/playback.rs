//! Event instance playback and state management.
//!
//! This module provides:
//! - [`InstanceId`]: Unique handle for one occurrence of an event
//! - [`PlayState`]: Current playback state (playing, paused, stopped)
//! - [`EventInstance`]: Playback, parameter and 3D state of one event occurrence
//!
//! Instances are created and owned by the [`AudioDirector`](crate::AudioDirector);
//! callers reach them through the [`InstanceId`] it hands out.

use crate::engine::{AudioEngineHandle, EventHandle, PlayCommand};
use crate::error::{Result, StudioError};
use crate::math::{Vec3, clamp_volume};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Lightweight, type-safe handle for event instances.
///
/// Several instances may share an event path; the id tells them apart.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct InstanceId(Uuid);

impl InstanceId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InstanceId({})", self.0)
    }
}

/// Represents the current playback state of an event instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayState {
    /// Not playing; the initial and terminal state
    #[default]
    Stopped,
    /// Audibly playing
    Playing,
    /// Started, then paused (retains timeline position)
    Paused,
}

/// One occurrence of an event definition.
pub struct EventInstance {
    id: InstanceId,
    path: String,
    handle: Option<EventHandle>,
    engine: Arc<dyn AudioEngineHandle>,
    state: PlayState,
    position: Vec3,
    velocity: Vec3,
    volume: f32,
    parameters: HashMap<String, f32>,
}

impl std::fmt::Debug for EventInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventInstance")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("handle", &self.handle)
            .field("state", &self.state)
            .field("position", &self.position)
            .field("velocity", &self.velocity)
            .field("volume", &self.volume)
            .field("parameters", &self.parameters)
            .finish()
    }
}

impl EventInstance {
    /// Creates the native event for `path`. The instance starts out stopped.
    pub(crate) fn create(engine: Arc<dyn AudioEngineHandle>, path: &str) -> Result<Self> {
        let handle = engine.create_event(path)?;
        log::debug!("Created event {} as {}", path, handle);
        Ok(Self {
            id: InstanceId::new(),
            path: path.to_string(),
            handle: Some(handle),
            engine,
            state: PlayState::Stopped,
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            volume: 1.0,
            parameters: HashMap::new(),
        })
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    /// Event definition path, e.g. `event:/Music/MainTheme`
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Native handle, `None` once released
    pub fn handle(&self) -> Option<EventHandle> {
        self.handle
    }

    pub fn state(&self) -> PlayState {
        self.state
    }

    /// True while started, whether paused or not
    pub fn is_playing(&self) -> bool {
        matches!(self.state, PlayState::Playing | PlayState::Paused)
    }

    pub fn is_paused(&self) -> bool {
        self.state == PlayState::Paused
    }

    pub fn is_stopped(&self) -> bool {
        self.state == PlayState::Stopped
    }

    pub fn is_released(&self) -> bool {
        self.handle.is_none()
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    fn live_handle(&self, action: &str) -> Result<EventHandle> {
        self.handle.ok_or_else(|| {
            log::warn!("Cannot {} event {}: already released", action, self.path);
            StudioError::InvalidState(format!("event {} has been released", self.path))
        })
    }

    fn send(&self, handle: EventHandle, command: PlayCommand, immediate: bool) -> Result<()> {
        self.engine
            .set_event_play_state(handle, command, immediate)
            .inspect_err(|e| {
                log::error!("Engine rejected {:?} for event {}: {}", command, self.path, e)
            })
    }

    /// Starts playback. A paused instance resumes where it left off.
    pub fn play(&mut self) -> Result<()> {
        if self.state == PlayState::Playing {
            log::warn!("Event {} is already playing", self.path);
            return Err(StudioError::AlreadyPlaying(self.path.clone()));
        }
        let handle = self.live_handle("play")?;
        let command = if self.state == PlayState::Paused {
            PlayCommand::Resume
        } else {
            PlayCommand::Play
        };
        self.send(handle, command, false)?;
        log::debug!("Playing event {} ({})", self.path, self.id);
        self.state = PlayState::Playing;
        Ok(())
    }

    /// Stops playback. `immediate` selects a hard cut over the release tail.
    ///
    /// The local transition always happens; an engine failure is still
    /// reported to the caller.
    pub fn stop(&mut self, immediate: bool) -> Result<()> {
        if self.state == PlayState::Stopped {
            return Ok(());
        }
        log::debug!(
            "Stopping event {} ({}, immediate: {})",
            self.path,
            self.id,
            immediate
        );
        self.state = PlayState::Stopped;
        match self.handle {
            Some(handle) => self.send(handle, PlayCommand::Stop, immediate),
            None => Ok(()),
        }
    }

    pub fn pause(&mut self) -> Result<()> {
        if self.state != PlayState::Playing {
            log::warn!(
                "Cannot pause event {}: state is {:?}",
                self.path,
                self.state
            );
            return Err(StudioError::InvalidState(format!(
                "pause requires a playing event, {} is {:?}",
                self.path, self.state
            )));
        }
        let handle = self.live_handle("pause")?;
        self.send(handle, PlayCommand::Pause, false)?;
        log::debug!("Paused event {} ({})", self.path, self.id);
        self.state = PlayState::Paused;
        Ok(())
    }

    pub fn resume(&mut self) -> Result<()> {
        if self.state != PlayState::Paused {
            log::warn!(
                "Cannot resume event {}: state is {:?}",
                self.path,
                self.state
            );
            return Err(StudioError::InvalidState(format!(
                "resume requires a paused event, {} is {:?}",
                self.path, self.state
            )));
        }
        let handle = self.live_handle("resume")?;
        self.send(handle, PlayCommand::Resume, false)?;
        log::debug!("Resumed event {} ({})", self.path, self.id);
        self.state = PlayState::Playing;
        Ok(())
    }

    /// Sets a parameter. The value is cached even if the engine rejects it.
    pub fn set_parameter(&mut self, name: &str, value: f32) -> Result<()> {
        log::debug!(
            "Setting parameter {} to {} for event {}",
            name,
            value,
            self.path
        );
        self.parameters.insert(name.to_string(), value);
        let Some(handle) = self.handle else {
            return Ok(());
        };
        self.engine
            .set_event_parameter(handle, name, value)
            .inspect_err(|e| log::error!("Failed to set parameter {} on {}: {}", name, self.path, e))
    }

    /// Last value set for `name`, or 0.0 if it was never set.
    pub fn parameter(&self, name: &str) -> f32 {
        self.parameters.get(name).copied().unwrap_or(0.0)
    }

    /// Overwrites the 3D attributes. A missing velocity means at rest.
    pub fn set_spatial_attributes(&mut self, position: Vec3, velocity: Option<Vec3>) -> Result<()> {
        let velocity = velocity.unwrap_or(Vec3::ZERO);
        self.position = position;
        self.velocity = velocity;
        let Some(handle) = self.handle else {
            return Ok(());
        };
        self.engine
            .set_event_3d(handle, position, velocity)
            .inspect_err(|e| log::error!("Failed to set 3D attributes on {}: {}", self.path, e))
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Sets the instance volume, clamped to `[0, 1]`.
    pub fn set_volume(&mut self, volume: f32) -> Result<()> {
        self.volume = clamp_volume(volume);
        let handle = self.live_handle("set volume of")?;
        self.engine
            .set_event_volume(handle, self.volume)
            .inspect_err(|e| log::error!("Failed to set volume on {}: {}", self.path, e))
    }

    /// Timeline position in milliseconds, 0 when the engine cannot say.
    pub fn timeline_position(&self) -> i32 {
        let Some(handle) = self.handle else {
            return 0;
        };
        self.engine
            .event_timeline_position(handle)
            .unwrap_or_else(|e| {
                log::warn!("Failed to read timeline of {}: {}", self.path, e);
                0
            })
    }

    pub fn set_timeline_position(&mut self, position_ms: i32) -> Result<()> {
        let handle = self.live_handle("seek")?;
        log::debug!(
            "Setting timeline position to {}ms for event {}",
            position_ms,
            self.path
        );
        self.engine
            .set_event_timeline_position(handle, position_ms)
            .inspect_err(|e| log::error!("Failed to seek {}: {}", self.path, e))
    }

    /// Asks the engine whether the event ended on its own and, if so,
    /// moves to [`PlayState::Stopped`]. Returns true on that transition.
    pub fn poll_completion(&mut self) -> bool {
        if self.state == PlayState::Stopped {
            return false;
        }
        let Some(handle) = self.handle else {
            return false;
        };
        match self.engine.event_finished(handle) {
            Ok(true) => {
                log::debug!("Event {} ({}) finished", self.path, self.id);
                self.state = PlayState::Stopped;
                true
            }
            Ok(false) => false,
            Err(e) => {
                log::warn!("Failed to poll event {}: {}", self.path, e);
                false
            }
        }
    }

    /// Stops the instance and destroys its native event. Safe to repeat.
    pub fn release(&mut self) -> Result<()> {
        self.state = PlayState::Stopped;
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        log::debug!("Releasing event {} ({})", self.path, self.id);
        self.engine
            .destroy_event(handle)
            .inspect_err(|e| log::error!("Failed to release {}: {}", self.path, e))
    }
}

impl Drop for EventInstance {
    fn drop(&mut self) {
        let _ = self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StudioDesc;
    use crate::engine::{HeadlessEngine, NativePlayState};

    fn setup() -> (Arc<HeadlessEngine>, EventInstance) {
        let engine = Arc::new(HeadlessEngine::new());
        engine.init_system(&StudioDesc::default()).unwrap();
        let instance = EventInstance::create(engine.clone(), "event:/Music").unwrap();
        (engine, instance)
    }

    #[test]
    fn test_state_machine() {
        let (engine, mut instance) = setup();
        let handle = instance.handle().unwrap();
        assert_eq!(instance.state(), PlayState::Stopped);

        instance.play().unwrap();
        assert_eq!(instance.state(), PlayState::Playing);
        instance.pause().unwrap();
        assert_eq!(instance.state(), PlayState::Paused);
        assert_eq!(
            engine.event_snapshot(handle).unwrap().state,
            NativePlayState::Paused
        );
        instance.resume().unwrap();
        assert_eq!(instance.state(), PlayState::Playing);
        instance.stop(false).unwrap();
        assert!(instance.is_stopped());
        assert_eq!(
            engine.event_snapshot(handle).unwrap().last_stop_immediate,
            Some(false)
        );
    }

    #[test]
    fn test_redundant_transitions_leave_state_alone() {
        let (_engine, mut instance) = setup();

        assert!(instance.pause().is_err());
        assert!(instance.resume().is_err());
        assert_eq!(instance.state(), PlayState::Stopped);

        instance.play().unwrap();
        assert!(matches!(
            instance.play(),
            Err(StudioError::AlreadyPlaying(_))
        ));
        assert!(instance.resume().is_err());
        assert_eq!(instance.state(), PlayState::Playing);

        instance.pause().unwrap();
        assert!(instance.pause().is_err());
        assert_eq!(instance.state(), PlayState::Paused);
    }

    #[test]
    fn test_play_while_paused_resumes() {
        let (_engine, mut instance) = setup();
        instance.play().unwrap();
        instance.pause().unwrap();
        instance.play().unwrap();
        assert_eq!(instance.state(), PlayState::Playing);
    }

    #[test]
    fn test_stop_when_stopped_is_noop() {
        let (engine, mut instance) = setup();
        assert!(instance.stop(true).is_ok());
        let snapshot = engine.event_snapshot(instance.handle().unwrap()).unwrap();
        assert_eq!(snapshot.last_stop_immediate, None);
    }

    #[test]
    fn test_parameters_survive_pause() {
        let (engine, mut instance) = setup();
        instance.play().unwrap();
        instance.set_parameter("x", 3.5).unwrap();
        instance.pause().unwrap();
        instance.resume().unwrap();

        assert_eq!(instance.parameter("x"), 3.5);
        assert_eq!(instance.parameter("unset"), 0.0);
        let snapshot = engine.event_snapshot(instance.handle().unwrap()).unwrap();
        assert_eq!(snapshot.parameters.get("x"), Some(&3.5));
    }

    #[test]
    fn test_spatial_attributes_default_velocity() {
        let (engine, mut instance) = setup();
        instance
            .set_spatial_attributes(Vec3::new(1.0, 2.0, 3.0), Some(Vec3::X))
            .unwrap();
        instance
            .set_spatial_attributes(Vec3::new(4.0, 5.0, 6.0), None)
            .unwrap();

        assert_eq!(instance.position(), Vec3::new(4.0, 5.0, 6.0));
        assert_eq!(instance.velocity(), Vec3::ZERO);
        let snapshot = engine.event_snapshot(instance.handle().unwrap()).unwrap();
        assert_eq!(snapshot.position, Vec3::new(4.0, 5.0, 6.0));
        assert_eq!(snapshot.velocity, Vec3::ZERO);
    }

    #[test]
    fn test_volume_is_clamped() {
        let (_engine, mut instance) = setup();
        instance.set_volume(1.7).unwrap();
        assert_eq!(instance.volume(), 1.0);
        instance.set_volume(-3.0).unwrap();
        assert_eq!(instance.volume(), 0.0);
    }

    #[test]
    fn test_timeline_pass_through() {
        let (_engine, mut instance) = setup();
        instance.play().unwrap();
        instance.set_timeline_position(1500).unwrap();
        assert_eq!(instance.timeline_position(), 1500);
    }

    #[test]
    fn test_poll_completion() {
        let (engine, mut instance) = setup();
        instance.play().unwrap();
        assert!(!instance.poll_completion());

        engine.finish_event(instance.handle().unwrap());
        assert!(instance.poll_completion());
        assert!(instance.is_stopped());
        assert!(!instance.poll_completion());
    }

    #[test]
    fn test_release_is_idempotent() {
        let (engine, mut instance) = setup();
        instance.play().unwrap();

        instance.release().unwrap();
        let after_first = (instance.state(), instance.is_released());
        instance.release().unwrap();

        assert_eq!((instance.state(), instance.is_released()), after_first);
        assert_eq!(after_first, (PlayState::Stopped, true));
        assert_eq!(engine.destroyed_count(), 1);
        assert_eq!(engine.live_event_count(), 0);
        assert!(instance.play().is_err());
    }

    #[test]
    fn test_drop_releases_native_event() {
        let (engine, instance) = setup();
        assert_eq!(engine.live_event_count(), 1);
        drop(instance);
        assert_eq!(engine.live_event_count(), 0);
    }
}
