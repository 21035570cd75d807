use super::{AudioEngineHandle, EventHandle, ListenerAttributes, PlayCommand};
use crate::config::StudioDesc;
use crate::error::{Result, StudioError};
use crate::math::Vec3;
use crate::mixer::MASTER_BUS;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

/// Playback state of an event as the runtime sees it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativePlayState {
    /// Created but never started
    Idle,
    Playing,
    Paused,
    Stopped,
}

/// Runtime-side record of one event instance
#[derive(Debug, Clone, PartialEq)]
pub struct NativeEvent {
    pub path: String,
    pub state: NativePlayState,
    pub parameters: HashMap<String, f32>,
    pub position: Vec3,
    pub velocity: Vec3,
    pub volume: f32,
    pub timeline_ms: i32,
    /// `immediate` flag of the most recent stop, if any
    pub last_stop_immediate: Option<bool>,
    /// Stop commands received, including stops through a bus
    pub stop_count: u32,
    /// 3D position the event had when it was started
    pub start_position: Option<Vec3>,
}

/// Runtime-side record of one mixer bus
#[derive(Debug, Clone, PartialEq)]
pub struct NativeBus {
    pub volume: f32,
    pub muted: bool,
    pub paused: bool,
    pub cpu_usage: f32,
    pub memory_usage: i64,
}

impl Default for NativeBus {
    fn default() -> Self {
        Self {
            volume: 1.0,
            muted: false,
            paused: false,
            cpu_usage: 0.0,
            memory_usage: 0,
        }
    }
}

/// What the runtime was brought up with
#[derive(Debug, Clone, PartialEq)]
pub struct SystemConfig {
    pub desc: StudioDesc,
    pub studio_flags: u32,
    pub core_flags: u32,
}

#[derive(Default)]
struct HeadlessState {
    unavailable: bool,
    initialized: bool,
    system: Option<SystemConfig>,
    next_handle: u64,
    events: HashMap<EventHandle, NativeEvent>,
    routes: HashMap<String, String>,
    buses: HashMap<String, NativeBus>,
    globals: HashMap<String, f32>,
    banks: HashSet<String>,
    listeners: Vec<Option<ListenerAttributes>>,
    update_count: u64,
    destroyed_count: usize,
}

impl HeadlessState {
    fn event_mut(&mut self, handle: EventHandle) -> Result<&mut NativeEvent> {
        self.events
            .get_mut(&handle)
            .ok_or_else(|| StudioError::NotFound(format!("{} is not a live event", handle)))
    }

    fn event(&self, handle: EventHandle) -> Result<&NativeEvent> {
        self.events
            .get(&handle)
            .ok_or_else(|| StudioError::NotFound(format!("{} is not a live event", handle)))
    }

    fn bus_mut(&mut self, path: &str) -> &mut NativeBus {
        self.buses.entry(path.to_string()).or_default()
    }

    fn route_of(&self, event_path: &str) -> &str {
        self.routes
            .get(event_path)
            .map(String::as_str)
            .unwrap_or(MASTER_BUS)
    }
}

/// Returns true if `bus` is `parent` or one of its sub-buses.
fn bus_contains(parent: &str, bus: &str) -> bool {
    if parent == MASTER_BUS || parent == bus {
        return true;
    }
    bus.strip_prefix(parent)
        .is_some_and(|rest| rest.starts_with('/'))
}

/// In-memory audio runtime.
///
/// `HeadlessEngine` keeps the same state a real middleware runtime would
/// (events, parameters, buses, banks, listeners) without producing sound.
/// It backs the test-suite, the demo, and hosts that run without an audio
/// device. Events are routed to the master bus unless
/// [`route_event`](Self::route_event) says otherwise.
pub struct HeadlessEngine {
    state: Mutex<HeadlessState>,
}

impl Default for HeadlessEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessEngine {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(HeadlessState::default()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HeadlessState>> {
        self.state
            .lock()
            .map_err(|e| StudioError::Engine(format!("Headless engine state poisoned: {}", e)))
    }

    /// Locks the state and fails if the runtime is marked unavailable.
    fn live(&self) -> Result<MutexGuard<'_, HeadlessState>> {
        let state = self.lock()?;
        if state.unavailable {
            return Err(StudioError::EngineUnavailable(
                "headless runtime marked unavailable".into(),
            ));
        }
        Ok(state)
    }

    /// Locks the state and fails unless the system has been initialized.
    fn running(&self) -> Result<MutexGuard<'_, HeadlessState>> {
        let state = self.live()?;
        if !state.initialized {
            return Err(StudioError::Engine("runtime not initialized".into()));
        }
        Ok(state)
    }

    /// Simulates the runtime (dis)appearing.
    pub fn set_available(&self, available: bool) {
        if let Ok(mut state) = self.lock() {
            state.unavailable = !available;
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.lock().map(|s| s.initialized).unwrap_or(false)
    }

    /// Routes every instance of `event_path` through `bus_path`.
    pub fn route_event(&self, event_path: &str, bus_path: &str) {
        if let Ok(mut state) = self.lock() {
            state
                .routes
                .insert(event_path.to_string(), bus_path.to_string());
        }
    }

    /// Simulates a native event reaching its natural end.
    ///
    /// Returns false if the handle is unknown.
    pub fn finish_event(&self, handle: EventHandle) -> bool {
        let Ok(mut state) = self.lock() else {
            return false;
        };
        match state.events.get_mut(&handle) {
            Some(event) => {
                event.state = NativePlayState::Stopped;
                true
            }
            None => false,
        }
    }

    /// Sets the diagnostics reported for `path`.
    pub fn set_bus_diagnostics(&self, path: &str, cpu_usage: f32, memory_usage: i64) {
        if let Ok(mut state) = self.lock() {
            let bus = state.bus_mut(path);
            bus.cpu_usage = cpu_usage;
            bus.memory_usage = memory_usage;
        }
    }

    pub fn event_snapshot(&self, handle: EventHandle) -> Option<NativeEvent> {
        self.lock().ok()?.events.get(&handle).cloned()
    }

    pub fn bus_snapshot(&self, path: &str) -> Option<NativeBus> {
        self.lock().ok()?.buses.get(path).cloned()
    }

    pub fn live_event_count(&self) -> usize {
        self.lock().map(|s| s.events.len()).unwrap_or(0)
    }

    /// Number of events created for `path` that are still alive.
    pub fn live_events_with_path(&self, path: &str) -> usize {
        self.lock()
            .map(|s| s.events.values().filter(|e| e.path == path).count())
            .unwrap_or(0)
    }

    pub fn destroyed_count(&self) -> usize {
        self.lock().map(|s| s.destroyed_count).unwrap_or(0)
    }

    pub fn update_count(&self) -> u64 {
        self.lock().map(|s| s.update_count).unwrap_or(0)
    }

    pub fn is_bank_loaded(&self, path: &str) -> bool {
        self.lock()
            .map(|s| s.banks.contains(path))
            .unwrap_or(false)
    }

    /// Configuration of the running system, `None` when not initialized.
    pub fn system_config(&self) -> Option<SystemConfig> {
        self.lock().ok()?.system.clone()
    }

    pub fn listener(&self, index: usize) -> Option<ListenerAttributes> {
        self.lock().ok()?.listeners.get(index).copied().flatten()
    }
}

impl AudioEngineHandle for HeadlessEngine {
    fn init_system(&self, desc: &StudioDesc) -> Result<()> {
        let mut state = self.live()?;
        let studio_flags = desc.studio_init_flags();
        let core_flags = desc.core_init_flags();
        state.initialized = true;
        state.listeners = vec![None; desc.listener_count];
        state.system = Some(SystemConfig {
            desc: desc.clone(),
            studio_flags,
            core_flags,
        });
        log::debug!(
            "Headless runtime up: {} Hz, {:?}, {} channels, {} listener(s), flags {:#x}/{:#x}",
            desc.sample_rate,
            desc.speaker_mode,
            desc.max_channels,
            desc.listener_count,
            studio_flags,
            core_flags
        );
        Ok(())
    }

    fn shutdown_system(&self) -> Result<()> {
        let mut state = self.lock()?;
        let leaked = state.events.len();
        if leaked > 0 {
            log::warn!("Headless runtime shutting down with {} live events", leaked);
        }
        state.events.clear();
        state.banks.clear();
        state.listeners.clear();
        state.system = None;
        state.initialized = false;
        Ok(())
    }

    fn update(&self) -> Result<()> {
        let mut state = self.running()?;
        state.update_count += 1;
        Ok(())
    }

    fn load_bank(&self, path: &str) -> Result<()> {
        let mut state = self.running()?;
        if path.is_empty() {
            return Err(StudioError::NotFound("bank path is empty".into()));
        }
        state.banks.insert(path.to_string());
        Ok(())
    }

    fn unload_bank(&self, path: &str) -> Result<()> {
        let mut state = self.running()?;
        if !state.banks.remove(path) {
            return Err(StudioError::NotFound(format!("bank {} is not loaded", path)));
        }
        Ok(())
    }

    fn create_event(&self, path: &str) -> Result<EventHandle> {
        let mut state = self.running()?;
        if path.is_empty() {
            return Err(StudioError::NotFound("event path is empty".into()));
        }
        state.next_handle += 1;
        let handle = EventHandle(state.next_handle);
        state.events.insert(
            handle,
            NativeEvent {
                path: path.to_string(),
                state: NativePlayState::Idle,
                parameters: HashMap::new(),
                position: Vec3::ZERO,
                velocity: Vec3::ZERO,
                volume: 1.0,
                timeline_ms: 0,
                last_stop_immediate: None,
                stop_count: 0,
                start_position: None,
            },
        );
        Ok(handle)
    }

    fn destroy_event(&self, handle: EventHandle) -> Result<()> {
        let mut state = self.live()?;
        if state.events.remove(&handle).is_none() {
            return Err(StudioError::NotFound(format!("{} is not a live event", handle)));
        }
        state.destroyed_count += 1;
        Ok(())
    }

    fn set_event_play_state(
        &self,
        handle: EventHandle,
        command: PlayCommand,
        immediate: bool,
    ) -> Result<()> {
        let mut state = self.live()?;
        let event = state.event_mut(handle)?;
        match command {
            PlayCommand::Play => {
                event.state = NativePlayState::Playing;
                event.timeline_ms = 0;
                event.start_position = Some(event.position);
            }
            PlayCommand::Pause => {
                if event.state == NativePlayState::Playing {
                    event.state = NativePlayState::Paused;
                }
            }
            PlayCommand::Resume => {
                if event.state == NativePlayState::Paused {
                    event.state = NativePlayState::Playing;
                }
            }
            PlayCommand::Stop => {
                event.state = NativePlayState::Stopped;
                event.last_stop_immediate = Some(immediate);
                event.stop_count += 1;
            }
        }
        Ok(())
    }

    fn event_finished(&self, handle: EventHandle) -> Result<bool> {
        let state = self.live()?;
        Ok(state.event(handle)?.state == NativePlayState::Stopped)
    }

    fn set_event_parameter(&self, handle: EventHandle, name: &str, value: f32) -> Result<()> {
        let mut state = self.live()?;
        state
            .event_mut(handle)?
            .parameters
            .insert(name.to_string(), value);
        Ok(())
    }

    fn event_parameter(&self, handle: EventHandle, name: &str) -> Result<f32> {
        let state = self.live()?;
        state
            .event(handle)?
            .parameters
            .get(name)
            .copied()
            .ok_or_else(|| StudioError::NotFound(format!("parameter {} is not set", name)))
    }

    fn set_event_3d(&self, handle: EventHandle, position: Vec3, velocity: Vec3) -> Result<()> {
        let mut state = self.live()?;
        let event = state.event_mut(handle)?;
        event.position = position;
        event.velocity = velocity;
        Ok(())
    }

    fn set_event_volume(&self, handle: EventHandle, volume: f32) -> Result<()> {
        let mut state = self.live()?;
        state.event_mut(handle)?.volume = volume;
        Ok(())
    }

    fn set_event_timeline_position(&self, handle: EventHandle, position_ms: i32) -> Result<()> {
        let mut state = self.live()?;
        state.event_mut(handle)?.timeline_ms = position_ms.max(0);
        Ok(())
    }

    fn event_timeline_position(&self, handle: EventHandle) -> Result<i32> {
        let state = self.live()?;
        Ok(state.event(handle)?.timeline_ms)
    }

    fn set_bus_volume(&self, path: &str, volume: f32) -> Result<()> {
        let mut state = self.running()?;
        state.bus_mut(path).volume = volume;
        Ok(())
    }

    fn set_bus_mute(&self, path: &str, muted: bool) -> Result<()> {
        let mut state = self.running()?;
        state.bus_mut(path).muted = muted;
        Ok(())
    }

    fn set_bus_pause(&self, path: &str, paused: bool) -> Result<()> {
        let mut state = self.running()?;
        state.bus_mut(path).paused = paused;
        Ok(())
    }

    fn stop_bus(&self, path: &str, immediate: bool) -> Result<()> {
        let mut state = self.running()?;
        let routed: Vec<EventHandle> = state
            .events
            .iter()
            .filter(|(_, event)| bus_contains(path, state.route_of(&event.path)))
            .map(|(handle, _)| *handle)
            .collect();
        for handle in routed {
            if let Some(event) = state.events.get_mut(&handle) {
                event.state = NativePlayState::Stopped;
                event.last_stop_immediate = Some(immediate);
                event.stop_count += 1;
            }
        }
        Ok(())
    }

    fn bus_cpu_usage(&self, path: &str) -> Result<f32> {
        let state = self.running()?;
        Ok(state.buses.get(path).map(|b| b.cpu_usage).unwrap_or(0.0))
    }

    fn bus_memory_usage(&self, path: &str) -> Result<i64> {
        let state = self.running()?;
        Ok(state.buses.get(path).map(|b| b.memory_usage).unwrap_or(0))
    }

    fn set_global_parameter(&self, name: &str, value: f32) -> Result<()> {
        let mut state = self.running()?;
        state.globals.insert(name.to_string(), value);
        Ok(())
    }

    fn global_parameter(&self, name: &str) -> Result<f32> {
        let state = self.running()?;
        state
            .globals
            .get(name)
            .copied()
            .ok_or_else(|| StudioError::NotFound(format!("global parameter {} is not set", name)))
    }

    fn set_listener_attributes(
        &self,
        index: usize,
        attributes: &ListenerAttributes,
    ) -> Result<()> {
        let mut state = self.running()?;
        let slot = state
            .listeners
            .get_mut(index)
            .ok_or_else(|| StudioError::NotFound(format!("listener {} does not exist", index)))?;
        *slot = Some(*attributes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running_engine() -> HeadlessEngine {
        let engine = HeadlessEngine::new();
        engine.init_system(&StudioDesc::default()).unwrap();
        engine
    }

    #[test]
    fn test_unavailable_engine_refuses_init() {
        let engine = HeadlessEngine::new();
        engine.set_available(false);
        assert!(matches!(
            engine.init_system(&StudioDesc::default()),
            Err(StudioError::EngineUnavailable(_))
        ));
        assert!(!engine.is_initialized());
    }

    #[test]
    fn test_init_records_system_config() {
        let engine = HeadlessEngine::new();
        let desc = StudioDesc::new()
            .live_update(true)
            .allow_missing_plugins(true)
            .right_handed_3d(false);
        engine.init_system(&desc).unwrap();

        let system = engine.system_config().unwrap();
        assert!(system.desc.live_update);
        assert!(!system.desc.synchronous_update);
        assert_eq!(
            system.studio_flags,
            crate::config::STUDIO_INIT_LIVE_UPDATE | crate::config::STUDIO_INIT_ALLOW_MISSING_PLUGINS
        );
        assert_eq!(system.core_flags, 0);

        engine.shutdown_system().unwrap();
        assert!(engine.system_config().is_none());
    }

    #[test]
    fn test_handles_are_distinct() {
        let engine = running_engine();
        let first = engine.create_event("event:/Music").unwrap();
        let second = engine.create_event("event:/Music").unwrap();
        assert_ne!(first.raw(), second.raw());
        assert_eq!(EventHandle::from_raw(first.raw()), first);
    }

    #[test]
    fn test_event_requires_running_system() {
        let engine = HeadlessEngine::new();
        assert!(engine.create_event("event:/Music").is_err());
    }

    #[test]
    fn test_stop_bus_only_touches_routed_events() {
        let engine = running_engine();
        engine.route_event("event:/SFX/Hit", "bus:/SFX");
        engine.route_event("event:/Music", "bus:/Music");

        let hit = engine.create_event("event:/SFX/Hit").unwrap();
        let music = engine.create_event("event:/Music").unwrap();
        engine
            .set_event_play_state(hit, PlayCommand::Play, false)
            .unwrap();
        engine
            .set_event_play_state(music, PlayCommand::Play, false)
            .unwrap();

        engine.stop_bus("bus:/SFX", true).unwrap();

        assert!(engine.event_finished(hit).unwrap());
        assert!(!engine.event_finished(music).unwrap());
        assert_eq!(
            engine.event_snapshot(hit).unwrap().last_stop_immediate,
            Some(true)
        );
    }

    #[test]
    fn test_bus_prefix_matching() {
        assert!(bus_contains("bus:/", "bus:/SFX"));
        assert!(bus_contains("bus:/SFX", "bus:/SFX/Weapons"));
        assert!(!bus_contains("bus:/SFX", "bus:/SFXExtra"));
        assert!(!bus_contains("bus:/Music", "bus:/SFX"));
    }

    #[test]
    fn test_destroy_unknown_event_is_not_found() {
        let engine = running_engine();
        assert!(matches!(
            engine.destroy_event(EventHandle::from_raw(99)),
            Err(StudioError::NotFound(_))
        ));
    }
}
