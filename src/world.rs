use crate::config::{EmitterConfig, StudioDesc};
use crate::director::AudioDirector;
use crate::emitter::SpatialEmitter;
use crate::engine::AudioEngineHandle;
use crate::error::{Result, StudioError};
use crate::math::{Vec2, Vec3};
use crate::playback::InstanceId;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Lightweight, type-safe handle for emitters registered with a world.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EmitterId(u64);

impl std::fmt::Display for EmitterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EmitterId({})", self.0)
    }
}

/// Frame-driven front door of PetalSonic Studio.
///
/// `StudioWorld` owns one [`AudioDirector`] and every registered
/// [`SpatialEmitter`]. The host calls [`advance`](Self::advance) exactly once
/// per frame; within that call emitters update first and the director's
/// maintenance sweep runs last, so anything stopped during the frame is
/// reclaimed in the same frame.
///
/// # Example
///
/// ```
/// use petalsonic_studio::*;
/// use std::sync::Arc;
///
/// let engine = Arc::new(HeadlessEngine::new());
/// let mut world = StudioWorld::new(StudioDesc::default(), engine);
/// world.initialize()?;
///
/// let emitter = world.add_emitter(EmitterConfig::volumetric("event:/SFX/Engine"));
/// world.play_emitter(emitter)?;
///
/// world.set_emitter_position(emitter, Vec3::new(1.0, 0.0, 0.0))?;
/// world.advance(1.0 / 60.0);
/// # Ok::<(), StudioError>(())
/// ```
pub struct StudioWorld {
    director: AudioDirector,
    emitters: BTreeMap<EmitterId, SpatialEmitter>,
    next_emitter_id: u64,
    frame: u64,
}

impl StudioWorld {
    pub fn new(desc: StudioDesc, engine: Arc<dyn AudioEngineHandle>) -> Self {
        Self {
            director: AudioDirector::new(desc, engine),
            emitters: BTreeMap::new(),
            next_emitter_id: 0,
            frame: 0,
        }
    }

    /// See [`AudioDirector::initialize`].
    pub fn initialize(&mut self) -> Result<()> {
        self.director.initialize()
    }

    pub fn director(&self) -> &AudioDirector {
        &self.director
    }

    pub fn director_mut(&mut self) -> &mut AudioDirector {
        &mut self.director
    }

    /// Number of completed [`advance`](Self::advance) calls.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Registers an emitter at the origin and runs its enter hook.
    pub fn add_emitter(&mut self, config: EmitterConfig) -> EmitterId {
        self.add_emitter_at(config, Vec3::ZERO)
    }

    /// Registers an emitter at `position` (engine space) and runs its enter
    /// hook, which auto-plays when configured.
    pub fn add_emitter_at(&mut self, config: EmitterConfig, position: Vec3) -> EmitterId {
        let id = EmitterId(self.next_emitter_id);
        self.next_emitter_id += 1;

        let mut emitter = SpatialEmitter::new(config);
        emitter.set_world_position(position);
        emitter.enter(&mut self.director);
        log::debug!("Added {} for {}", id, emitter.event_path());

        self.emitters.insert(id, emitter);
        id
    }

    /// Runs the emitter's exit hook and hands it back.
    pub fn remove_emitter(&mut self, id: EmitterId) -> Option<SpatialEmitter> {
        let mut emitter = self.emitters.remove(&id)?;
        emitter.exit(&mut self.director);
        log::debug!("Removed {}", id);
        Some(emitter)
    }

    pub fn emitter(&self, id: EmitterId) -> Option<&SpatialEmitter> {
        self.emitters.get(&id)
    }

    pub fn emitter_mut(&mut self, id: EmitterId) -> Option<&mut SpatialEmitter> {
        self.emitters.get_mut(&id)
    }

    pub fn emitter_ids(&self) -> Vec<EmitterId> {
        self.emitters.keys().copied().collect()
    }

    fn emitter_entry(&mut self, id: EmitterId) -> Result<&mut SpatialEmitter> {
        self.emitters
            .get_mut(&id)
            .ok_or_else(|| StudioError::NotFound(format!("{} is not registered", id)))
    }

    pub fn set_emitter_position(&mut self, id: EmitterId, position: Vec3) -> Result<()> {
        self.emitter_entry(id)?.set_world_position(position);
        Ok(())
    }

    pub fn set_emitter_planar_position(&mut self, id: EmitterId, position: Vec2) -> Result<()> {
        let emitter = self
            .emitters
            .get_mut(&id)
            .ok_or_else(|| StudioError::NotFound(format!("{} is not registered", id)))?;
        emitter.set_planar_position(&self.director, position);
        Ok(())
    }

    pub fn play_emitter(&mut self, id: EmitterId) -> Result<InstanceId> {
        let emitter = self
            .emitters
            .get_mut(&id)
            .ok_or_else(|| StudioError::NotFound(format!("{} is not registered", id)))?;
        emitter.play(&mut self.director)
    }

    pub fn stop_emitter(&mut self, id: EmitterId, immediate: bool) -> Result<()> {
        let emitter = self
            .emitters
            .get_mut(&id)
            .ok_or_else(|| StudioError::NotFound(format!("{} is not registered", id)))?;
        emitter.stop(&mut self.director, immediate)
    }

    pub fn is_emitter_playing(&self, id: EmitterId) -> bool {
        self.emitters
            .get(&id)
            .is_some_and(|emitter| emitter.is_playing(&self.director))
    }

    /// Advances one frame: emitters first, then the director sweep.
    ///
    /// Returns the number of instances the sweep reclaimed.
    pub fn advance(&mut self, delta_seconds: f32) -> usize {
        for emitter in self.emitters.values_mut() {
            emitter.tick(&mut self.director, delta_seconds);
        }
        let pruned = self.director.tick();
        self.frame += 1;
        pruned
    }

    /// Removes every emitter (running exit hooks) and shuts the director down.
    pub fn shutdown(&mut self) {
        for (_, mut emitter) in std::mem::take(&mut self.emitters) {
            emitter.exit(&mut self.director);
        }
        self.director.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::HeadlessEngine;

    fn setup() -> (Arc<HeadlessEngine>, StudioWorld) {
        let engine = Arc::new(HeadlessEngine::new());
        let mut world = StudioWorld::new(StudioDesc::default(), engine.clone());
        world.initialize().unwrap();
        (engine, world)
    }

    #[test]
    fn test_auto_play_on_add() {
        let (_engine, mut world) = setup();
        let id = world.add_emitter_at(
            EmitterConfig::volumetric("event:/Ambience/River").auto_play(true),
            Vec3::new(0.0, 0.0, 10.0),
        );
        assert!(world.is_emitter_playing(id));

        let instance_id = world.emitter(id).unwrap().instance_id().unwrap();
        assert_eq!(
            world.director().instance(instance_id).unwrap().position(),
            Vec3::new(0.0, 0.0, 10.0)
        );
    }

    #[test]
    fn test_stop_in_frame_is_swept_same_frame() {
        let (_engine, mut world) = setup();
        let id = world.add_emitter(EmitterConfig::volumetric("event:/SFX/Engine"));
        world.play_emitter(id).unwrap();

        world.stop_emitter(id, false).unwrap();
        assert_eq!(world.advance(1.0 / 60.0), 1);
        assert_eq!(world.director().active_instance_count(), 0);
        assert_eq!(world.frame(), 1);
    }

    #[test]
    fn test_remove_emitter_stops_once() {
        let (engine, mut world) = setup();
        let id = world.add_emitter(EmitterConfig::volumetric("event:/SFX/Engine"));
        let instance_id = world.play_emitter(id).unwrap();
        let handle = world
            .director()
            .instance(instance_id)
            .unwrap()
            .handle()
            .unwrap();

        let emitter = world.remove_emitter(id).unwrap();
        assert!(emitter.instance_id().is_none());
        let native = engine.event_snapshot(handle).unwrap();
        assert_eq!(native.stop_count, 1);
        assert_eq!(native.last_stop_immediate, Some(false));
        assert!(world.remove_emitter(id).is_none());

        // The sweep releases the stopped instance without stopping it again.
        world.advance(0.016);
        assert!(engine.event_snapshot(handle).is_none());
        assert_eq!(engine.destroyed_count(), 1);
    }

    #[test]
    fn test_shutdown_stops_emitter_instance_once() {
        let (engine, mut world) = setup();
        let id = world.add_emitter(EmitterConfig::volumetric("event:/SFX/Engine").auto_play(true));
        let instance_id = world.emitter(id).unwrap().instance_id().unwrap();
        let handle = world
            .director()
            .instance(instance_id)
            .unwrap()
            .handle()
            .unwrap();

        world.remove_emitter(id);
        assert_eq!(engine.event_snapshot(handle).unwrap().stop_count, 1);
        world.shutdown();
        assert_eq!(engine.destroyed_count(), 1);
        assert_eq!(world.director().active_instance_count(), 0);
    }

    #[test]
    fn test_unknown_emitter_is_not_found() {
        let (_engine, mut world) = setup();
        let bogus = EmitterId(42);
        assert!(matches!(
            world.play_emitter(bogus),
            Err(StudioError::NotFound(_))
        ));
        assert!(world.set_emitter_position(bogus, Vec3::ONE).is_err());
        assert!(!world.is_emitter_playing(bogus));
    }

    #[test]
    fn test_shutdown_clears_everything() {
        let (engine, mut world) = setup();
        let id = world.add_emitter(EmitterConfig::planar("event:/SFX/Engine").auto_play(true));
        world.director_mut().play_event("event:/Music").unwrap();
        assert!(world.is_emitter_playing(id));

        world.shutdown();
        assert!(world.emitter_ids().is_empty());
        assert_eq!(world.director().active_instance_count(), 0);
        assert_eq!(engine.live_event_count(), 0);
    }
}
