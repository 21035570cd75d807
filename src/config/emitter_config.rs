/// Coordinate space an emitter's host transform lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmitterSpace {
    /// 2D host transform, mapped to the engine as (x, 0, ±y) with zero height
    Planar,
    /// 3D host transform, passed through unchanged
    #[default]
    Volumetric,
}

/// Configuration for a [`SpatialEmitter`](crate::SpatialEmitter)
#[derive(Debug, Clone)]
pub struct EmitterConfig {
    /// Event definition path, e.g. `event:/SFX/Engine`
    pub event_path: String,
    /// Start playing as soon as the emitter enters the world
    pub auto_play: bool,
    /// Stop the owned instance when the emitter leaves the world
    pub stop_on_exit: bool,
    pub space: EmitterSpace,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            event_path: String::new(),
            auto_play: false,
            stop_on_exit: true,
            space: EmitterSpace::Volumetric,
        }
    }
}

impl EmitterConfig {
    /// Create a 3D emitter configuration for the given event
    pub fn volumetric(event_path: impl Into<String>) -> Self {
        Self {
            event_path: event_path.into(),
            ..Default::default()
        }
    }

    /// Create a 2D emitter configuration for the given event
    pub fn planar(event_path: impl Into<String>) -> Self {
        Self {
            event_path: event_path.into(),
            space: EmitterSpace::Planar,
            ..Default::default()
        }
    }

    pub fn auto_play(mut self, enable: bool) -> Self {
        self.auto_play = enable;
        self
    }

    pub fn stop_on_exit(mut self, enable: bool) -> Self {
        self.stop_on_exit = enable;
        self
    }

    /// Returns true if this configuration is for a 2D emitter
    pub fn is_planar(&self) -> bool {
        matches!(self.space, EmitterSpace::Planar)
    }
}
