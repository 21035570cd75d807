use crate::error::{Result, StudioError};

/// Output speaker layout requested from the audio runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpeakerMode {
    /// Let the runtime pick the device default
    #[default]
    Default,
    Raw,
    Mono,
    Stereo,
    Quad,
    Surround,
    FivePointOne,
    SevenPointOne,
    SevenPointOnePointFour,
}

/// Core runtime init flag: right-handed 3D coordinates
pub const INIT_3D_RIGHT_HANDED: u32 = 4;
/// Studio init flag: accept profiler connections
pub const STUDIO_INIT_LIVE_UPDATE: u32 = 1;
/// Studio init flag: load banks that reference missing plugins
pub const STUDIO_INIT_ALLOW_MISSING_PLUGINS: u32 = 2;
/// Studio init flag: run updates on the calling thread
pub const STUDIO_INIT_SYNCHRONOUS_UPDATE: u32 = 4;

/// Configuration descriptor for a PetalSonic Studio system
#[derive(Debug, Clone, PartialEq)]
pub struct StudioDesc {
    /// Software mixer sample rate
    pub sample_rate: u32,
    /// Speaker layout of the software mixer
    pub speaker_mode: SpeakerMode,
    /// Maximum number of virtual channels the runtime may allocate
    pub max_channels: u32,
    /// Number of listeners the runtime spatializes against
    pub listener_count: usize,
    /// Allow a profiler/authoring tool to connect to the running system
    pub live_update: bool,
    /// Keep loading banks even if they reference plugins that are missing
    pub allow_missing_plugins: bool,
    /// Run runtime updates on the caller's thread instead of an async one
    pub synchronous_update: bool,
    /// Use a right-handed 3D coordinate system. Also selects the depth sign
    /// planar emitters are mapped with, see [`planar_to_engine`](crate::math::planar_to_engine)
    pub right_handed_3d: bool,
    /// Minimum per-axis movement before an emitter counts as moved
    pub position_epsilon: f32,
    /// Banks loaded as part of initialization
    pub banks: Vec<String>,
    /// Studio events buffered until the host polls; newer events are dropped
    /// once the queue is full
    pub event_queue_capacity: usize,
}

impl Default for StudioDesc {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            speaker_mode: SpeakerMode::Default,
            max_channels: 1024,
            listener_count: 1,
            live_update: false,
            allow_missing_plugins: false,
            synchronous_update: false,
            right_handed_3d: true,
            position_epsilon: 1.0e-5,
            banks: Vec::new(),
            event_queue_capacity: 1024,
        }
    }
}

impl StudioDesc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sample_rate(mut self, rate: u32) -> Self {
        self.sample_rate = rate;
        self
    }

    pub fn speaker_mode(mut self, mode: SpeakerMode) -> Self {
        self.speaker_mode = mode;
        self
    }

    pub fn max_channels(mut self, max: u32) -> Self {
        self.max_channels = max;
        self
    }

    pub fn listener_count(mut self, count: usize) -> Self {
        self.listener_count = count;
        self
    }

    pub fn live_update(mut self, enable: bool) -> Self {
        self.live_update = enable;
        self
    }

    pub fn allow_missing_plugins(mut self, enable: bool) -> Self {
        self.allow_missing_plugins = enable;
        self
    }

    pub fn synchronous_update(mut self, enable: bool) -> Self {
        self.synchronous_update = enable;
        self
    }

    pub fn right_handed_3d(mut self, enable: bool) -> Self {
        self.right_handed_3d = enable;
        self
    }

    pub fn position_epsilon(mut self, epsilon: f32) -> Self {
        self.position_epsilon = epsilon;
        self
    }

    pub fn event_queue_capacity(mut self, capacity: usize) -> Self {
        self.event_queue_capacity = capacity;
        self
    }

    pub fn bank(mut self, path: impl Into<String>) -> Self {
        self.banks.push(path.into());
        self
    }

    /// Studio-level init flags a runtime is brought up with.
    pub fn studio_init_flags(&self) -> u32 {
        let mut flags = 0;
        if self.live_update {
            flags |= STUDIO_INIT_LIVE_UPDATE;
        }
        if self.allow_missing_plugins {
            flags |= STUDIO_INIT_ALLOW_MISSING_PLUGINS;
        }
        if self.synchronous_update {
            flags |= STUDIO_INIT_SYNCHRONOUS_UPDATE;
        }
        flags
    }

    /// Core-level init flags a runtime is brought up with.
    pub fn core_init_flags(&self) -> u32 {
        if self.right_handed_3d {
            INIT_3D_RIGHT_HANDED
        } else {
            0
        }
    }

    /// Checks the descriptor for values the runtime cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(StudioError::Configuration(
                "sample_rate must be non-zero".into(),
            ));
        }
        if self.max_channels == 0 {
            return Err(StudioError::Configuration(
                "max_channels must be non-zero".into(),
            ));
        }
        if self.listener_count == 0 {
            return Err(StudioError::Configuration(
                "at least one listener is required".into(),
            ));
        }
        if self.event_queue_capacity == 0 {
            return Err(StudioError::Configuration(
                "event_queue_capacity must be non-zero".into(),
            ));
        }
        if self.position_epsilon.is_nan() || self.position_epsilon < 0.0 {
            return Err(StudioError::Configuration(format!(
                "position_epsilon must be non-negative, got {}",
                self.position_epsilon
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_desc_is_valid() {
        assert!(StudioDesc::default().validate().is_ok());
    }

    #[test]
    fn test_builder_chains() {
        let desc = StudioDesc::new()
            .sample_rate(44100)
            .speaker_mode(SpeakerMode::FivePointOne)
            .listener_count(2)
            .live_update(true)
            .bank("res://banks/Master.bank");

        assert_eq!(desc.sample_rate, 44100);
        assert_eq!(desc.speaker_mode, SpeakerMode::FivePointOne);
        assert_eq!(desc.listener_count, 2);
        assert!(desc.live_update);
        assert_eq!(desc.banks, vec!["res://banks/Master.bank".to_string()]);
    }

    #[test]
    fn test_init_flags() {
        let defaults = StudioDesc::default();
        assert_eq!(defaults.studio_init_flags(), 0);
        assert_eq!(defaults.core_init_flags(), INIT_3D_RIGHT_HANDED);

        let desc = StudioDesc::new()
            .live_update(true)
            .synchronous_update(true)
            .allow_missing_plugins(true)
            .right_handed_3d(false);
        assert_eq!(
            desc.studio_init_flags(),
            STUDIO_INIT_LIVE_UPDATE
                | STUDIO_INIT_ALLOW_MISSING_PLUGINS
                | STUDIO_INIT_SYNCHRONOUS_UPDATE
        );
        assert_eq!(desc.core_init_flags(), 0);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(matches!(
            StudioDesc::new().sample_rate(0).validate(),
            Err(StudioError::Configuration(_))
        ));
        assert!(StudioDesc::new().listener_count(0).validate().is_err());
        assert!(StudioDesc::new().max_channels(0).validate().is_err());
        assert!(StudioDesc::new().event_queue_capacity(0).validate().is_err());
        assert!(StudioDesc::new().position_epsilon(-1.0).validate().is_err());
        assert!(StudioDesc::new().position_epsilon(f32::NAN).validate().is_err());
    }
}
