//! The boundary between PetalSonic Studio and the native audio runtime.
//!
//! Everything the director, instances and buses ask of the middleware goes
//! through [`AudioEngineHandle`]. Implementations are expected to be
//! internally synchronized and non-blocking from the caller's point of view,
//! which is why every method takes `&self`.

mod headless;

pub use headless::{HeadlessEngine, NativeBus, NativeEvent, NativePlayState, SystemConfig};

use crate::config::StudioDesc;
use crate::error::Result;
use crate::math::{Pose, Vec3};

/// Opaque identity of a native event instance.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct EventHandle(u64);

impl EventHandle {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for EventHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EventHandle({})", self.0)
    }
}

/// Playback transitions forwarded to the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayCommand {
    Play,
    Pause,
    Resume,
    /// Stop; the accompanying `immediate` flag selects a hard cut or the
    /// event's authored release tail
    Stop,
}

/// Position, orientation and velocity of one listener.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ListenerAttributes {
    pub pose: Pose,
    pub velocity: Vec3,
}

impl ListenerAttributes {
    pub fn new(pose: Pose) -> Self {
        Self {
            pose,
            velocity: Vec3::ZERO,
        }
    }

    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }
}

/// Typed interface to the native audio runtime.
///
/// Errors returned here are recovered by the caller: logged and turned into
/// neutral values, except during system initialization.
pub trait AudioEngineHandle: Send + Sync {
    fn init_system(&self, desc: &StudioDesc) -> Result<()>;
    fn shutdown_system(&self) -> Result<()>;
    /// Pumps the runtime once per frame.
    fn update(&self) -> Result<()>;

    fn load_bank(&self, path: &str) -> Result<()>;
    fn unload_bank(&self, path: &str) -> Result<()>;

    fn create_event(&self, path: &str) -> Result<EventHandle>;
    fn destroy_event(&self, handle: EventHandle) -> Result<()>;
    fn set_event_play_state(
        &self,
        handle: EventHandle,
        command: PlayCommand,
        immediate: bool,
    ) -> Result<()>;
    /// Returns true once the native event has stopped, including natural
    /// completion of one-shot content.
    fn event_finished(&self, handle: EventHandle) -> Result<bool>;
    fn set_event_parameter(&self, handle: EventHandle, name: &str, value: f32) -> Result<()>;
    fn event_parameter(&self, handle: EventHandle, name: &str) -> Result<f32>;
    fn set_event_3d(&self, handle: EventHandle, position: Vec3, velocity: Vec3) -> Result<()>;
    fn set_event_volume(&self, handle: EventHandle, volume: f32) -> Result<()>;
    fn set_event_timeline_position(&self, handle: EventHandle, position_ms: i32) -> Result<()>;
    fn event_timeline_position(&self, handle: EventHandle) -> Result<i32>;

    fn set_bus_volume(&self, path: &str, volume: f32) -> Result<()>;
    fn set_bus_mute(&self, path: &str, muted: bool) -> Result<()>;
    fn set_bus_pause(&self, path: &str, paused: bool) -> Result<()>;
    /// Stops every event routed through `path` (including its sub-buses).
    fn stop_bus(&self, path: &str, immediate: bool) -> Result<()>;
    fn bus_cpu_usage(&self, path: &str) -> Result<f32>;
    fn bus_memory_usage(&self, path: &str) -> Result<i64>;

    fn set_global_parameter(&self, name: &str, value: f32) -> Result<()>;
    fn global_parameter(&self, name: &str) -> Result<f32>;

    fn set_listener_attributes(&self, index: usize, attributes: &ListenerAttributes)
    -> Result<()>;
}
