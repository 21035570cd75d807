//! Emitters that keep an event instance glued to a moving world transform.

use crate::config::EmitterConfig;
use crate::director::AudioDirector;
use crate::error::{Result, StudioError};
use crate::math::{Vec2, Vec3, planar_to_engine};
use crate::playback::{EventInstance, InstanceId};

/// Plays one event at a host-driven world position.
///
/// The host pushes the current transform with
/// [`set_world_position`](Self::set_world_position) (3D) or
/// [`set_planar_position`](Self::set_planar_position) (2D) and calls
/// [`tick`](Self::tick) once per frame. While the owned instance plays, the
/// emitter derives velocity by finite difference between ticks and forwards
/// position and velocity to it.
///
/// A [`Planar`](crate::EmitterSpace::Planar) emitter always keeps its
/// height at zero, whichever setter moved it.
#[derive(Debug)]
pub struct SpatialEmitter {
    config: EmitterConfig,
    instance: Option<InstanceId>,
    /// Current position in engine space
    world_position: Vec3,
    last_position: Vec3,
    last_velocity: Vec3,
}

/// A clone copies configuration and position but owns no instance.
impl Clone for SpatialEmitter {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            instance: None,
            world_position: self.world_position,
            last_position: self.world_position,
            last_velocity: Vec3::ZERO,
        }
    }
}

impl SpatialEmitter {
    pub fn new(config: EmitterConfig) -> Self {
        Self {
            config,
            instance: None,
            world_position: Vec3::ZERO,
            last_position: Vec3::ZERO,
            last_velocity: Vec3::ZERO,
        }
    }

    pub fn config(&self) -> &EmitterConfig {
        &self.config
    }

    pub fn event_path(&self) -> &str {
        &self.config.event_path
    }

    /// Changes the event played by the next [`play`](Self::play).
    pub fn set_event_path(&mut self, path: impl Into<String>) {
        self.config.event_path = path.into();
    }

    pub fn instance_id(&self) -> Option<InstanceId> {
        self.instance
    }

    /// Current position in engine space.
    pub fn world_position(&self) -> Vec3 {
        self.world_position
    }

    /// Sets the position in engine space. Planar emitters drop the height.
    pub fn set_world_position(&mut self, position: Vec3) {
        self.world_position = if self.config.is_planar() {
            position.with_y(0.0)
        } else {
            position
        };
    }

    /// Sets a 2D host position, mapped into engine space with the
    /// director's handedness (see [`planar_to_engine`]).
    pub fn set_planar_position(&mut self, director: &AudioDirector, position: Vec2) {
        self.world_position = planar_to_engine(position, director.desc().right_handed_3d);
    }

    /// Called when the emitter joins the world.
    ///
    /// Seeds the finite-difference state and auto-plays if configured.
    pub fn enter(&mut self, director: &mut AudioDirector) {
        self.last_position = self.world_position;
        self.last_velocity = Vec3::ZERO;
        if self.config.auto_play && !self.config.event_path.is_empty() {
            if let Err(e) = self.play(director) {
                if e.is_precondition() {
                    log::warn!("Skipped auto-play of {}: {}", self.config.event_path, e);
                } else {
                    log::error!("Auto-play of {} failed: {}", self.config.event_path, e);
                }
            }
        }
    }

    /// Called when the emitter leaves the world.
    pub fn exit(&mut self, director: &mut AudioDirector) {
        if self.config.stop_on_exit && self.instance.is_some() {
            if let Err(e) = self.stop(director, false) {
                log::warn!(
                    "Failed to stop {} while leaving the world: {}",
                    self.config.event_path,
                    e
                );
            }
        }
    }

    pub fn is_playing(&self, director: &AudioDirector) -> bool {
        self.instance
            .and_then(|id| director.instance(id))
            .is_some_and(|instance| instance.is_playing())
    }

    /// Starts the event at the emitter's current position.
    pub fn play(&mut self, director: &mut AudioDirector) -> Result<InstanceId> {
        if self.config.event_path.is_empty() {
            log::warn!("Cannot play event: event path is not set");
            return Err(StudioError::InvalidState("event path is not set".into()));
        }
        if self.is_playing(director) {
            log::warn!(
                "Event {} is already playing on this emitter",
                self.config.event_path
            );
            return Err(StudioError::AlreadyPlaying(self.config.event_path.clone()));
        }

        let instance_id =
            director.play_event_at_position(&self.config.event_path, self.world_position)?;
        self.instance = Some(instance_id);
        self.last_position = self.world_position;
        self.last_velocity = Vec3::ZERO;
        Ok(instance_id)
    }

    /// Stops the owned instance and gives it up, whatever the stop returned.
    pub fn stop(&mut self, director: &mut AudioDirector, immediate: bool) -> Result<()> {
        let Some(instance_id) = self.instance.take() else {
            return Ok(());
        };
        match director.instance_mut(instance_id) {
            Some(instance) => instance.stop(immediate),
            None => Ok(()),
        }
    }

    fn owned_instance<'a>(
        &self,
        director: &'a mut AudioDirector,
    ) -> Result<&'a mut EventInstance> {
        let not_found = || {
            StudioError::NotFound(format!(
                "no live instance of {} on this emitter",
                self.config.event_path
            ))
        };
        let instance_id = self.instance.ok_or_else(not_found)?;
        director.instance_mut(instance_id).ok_or_else(not_found)
    }

    pub fn pause(&self, director: &mut AudioDirector) -> Result<()> {
        self.owned_instance(director)?.pause()
    }

    pub fn resume(&self, director: &mut AudioDirector) -> Result<()> {
        self.owned_instance(director)?.resume()
    }

    pub fn set_parameter(&self, director: &mut AudioDirector, name: &str, value: f32) -> Result<()> {
        self.owned_instance(director)?.set_parameter(name, value)
    }

    /// Parameter of the owned instance; 0.0 without one.
    pub fn parameter(&self, director: &AudioDirector, name: &str) -> f32 {
        self.instance
            .and_then(|id| director.instance(id))
            .map(|instance| instance.parameter(name))
            .unwrap_or(0.0)
    }

    /// Per-frame update.
    ///
    /// While the owned instance plays, pushes position and
    /// `(current - last) / delta_seconds` when the emitter moved, and a zero
    /// velocity once when it comes to rest. The last position is always
    /// refreshed.
    pub fn tick(&mut self, director: &mut AudioDirector, delta_seconds: f32) {
        let current = self.world_position;
        let last = std::mem::replace(&mut self.last_position, current);

        let Some(instance_id) = self.instance else {
            return;
        };
        let epsilon = director.desc().position_epsilon;
        let Some(instance) = director.instance_mut(instance_id) else {
            // Reclaimed by the director after it stopped.
            self.instance = None;
            self.last_velocity = Vec3::ZERO;
            return;
        };
        if !instance.is_playing() {
            return;
        }

        let moved = !current.abs_diff_eq(last, epsilon);
        let velocity = if moved && delta_seconds > 0.0 {
            (current - last) / delta_seconds
        } else {
            Vec3::ZERO
        };

        if moved || self.last_velocity != Vec3::ZERO {
            if let Err(e) = instance.set_spatial_attributes(current, Some(velocity)) {
                log::warn!("Failed to move {}: {}", self.config.event_path, e);
            }
            self.last_velocity = velocity;
        }
    }
}
