// Mixer module - volume, mute and pause control for mixer buses
// Buses mirror the authored mixer topology, so they are never destroyed.

use crate::engine::AudioEngineHandle;
use crate::error::Result;
use crate::math::clamp_volume;
use std::sync::Arc;

/// Path of the master bus every other bus routes into
pub const MASTER_BUS: &str = "bus:/";

/// Control surface for one mixer bus, e.g. `bus:/Music`
pub struct BusControl {
    path: String,
    volume: f32,
    muted: bool,
    paused: bool,
    engine: Arc<dyn AudioEngineHandle>,
}

impl std::fmt::Debug for BusControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BusControl")
            .field("path", &self.path)
            .field("volume", &self.volume)
            .field("muted", &self.muted)
            .field("paused", &self.paused)
            .finish()
    }
}

impl BusControl {
    pub(crate) fn new(path: &str, engine: Arc<dyn AudioEngineHandle>) -> Self {
        log::debug!("Binding bus {}", path);
        Self {
            path: path.to_string(),
            volume: 1.0,
            muted: false,
            paused: false,
            engine,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Clamps `volume` to `[0, 1]`, stores it and pushes it to the engine.
    ///
    /// Applied on every call, even when the value did not change.
    pub fn set_volume(&mut self, volume: f32) -> Result<()> {
        self.volume = clamp_volume(volume);
        log::debug!("Setting bus {} volume to {}", self.path, self.volume);
        self.engine
            .set_bus_volume(&self.path, self.volume)
            .inspect_err(|e| log::error!("Failed to set volume of bus {}: {}", self.path, e))
    }

    pub fn set_muted(&mut self, muted: bool) -> Result<()> {
        self.muted = muted;
        log::debug!("Setting bus {} muted state to {}", self.path, muted);
        self.engine
            .set_bus_mute(&self.path, muted)
            .inspect_err(|e| log::error!("Failed to mute bus {}: {}", self.path, e))
    }

    pub fn set_paused(&mut self, paused: bool) -> Result<()> {
        self.paused = paused;
        log::debug!("Setting bus {} paused state to {}", self.path, paused);
        self.engine
            .set_bus_pause(&self.path, paused)
            .inspect_err(|e| log::error!("Failed to pause bus {}: {}", self.path, e))
    }

    /// Stops every event routed through this bus.
    pub fn stop_all_events(&self, immediate: bool) -> Result<()> {
        log::debug!(
            "Stopping all events on bus {} (immediate: {})",
            self.path,
            immediate
        );
        self.engine
            .stop_bus(&self.path, immediate)
            .inspect_err(|e| log::error!("Failed to stop bus {}: {}", self.path, e))
    }

    /// CPU usage as a percentage, 0 when unavailable
    pub fn cpu_usage(&self) -> f32 {
        self.engine.bus_cpu_usage(&self.path).unwrap_or_else(|e| {
            log::warn!("CPU usage of bus {} unavailable: {}", self.path, e);
            0.0
        })
    }

    /// Memory usage in bytes, 0 when unavailable
    pub fn memory_usage(&self) -> i64 {
        self.engine.bus_memory_usage(&self.path).unwrap_or_else(|e| {
            log::warn!("Memory usage of bus {} unavailable: {}", self.path, e);
            0
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StudioDesc;
    use crate::engine::HeadlessEngine;

    fn setup(path: &str) -> (Arc<HeadlessEngine>, BusControl) {
        let engine = Arc::new(HeadlessEngine::new());
        engine.init_system(&StudioDesc::default()).unwrap();
        let bus = BusControl::new(path, engine.clone());
        (engine, bus)
    }

    #[test]
    fn test_volume_clamp() {
        let (engine, mut bus) = setup("bus:/Music");
        for (input, expected) in [(-1.0, 0.0), (0.0, 0.0), (0.4, 0.4), (1.0, 1.0), (2.5, 1.0)] {
            bus.set_volume(input).unwrap();
            assert_eq!(bus.volume(), expected);
            assert_eq!(engine.bus_snapshot("bus:/Music").unwrap().volume, expected);
        }
    }

    #[test]
    fn test_mute_and_pause() {
        let (engine, mut bus) = setup("bus:/SFX");
        bus.set_muted(true).unwrap();
        bus.set_paused(true).unwrap();
        assert!(bus.is_muted());
        assert!(bus.is_paused());

        let native = engine.bus_snapshot("bus:/SFX").unwrap();
        assert!(native.muted);
        assert!(native.paused);

        bus.set_paused(false).unwrap();
        assert!(!engine.bus_snapshot("bus:/SFX").unwrap().paused);
    }

    #[test]
    fn test_diagnostics_default_to_zero() {
        let (engine, bus) = setup("bus:/Ambience");
        assert_eq!(bus.cpu_usage(), 0.0);
        assert_eq!(bus.memory_usage(), 0);

        engine.set_bus_diagnostics("bus:/Ambience", 2.5, 4096);
        assert_eq!(bus.cpu_usage(), 2.5);
        assert_eq!(bus.memory_usage(), 4096);

        engine.set_available(false);
        assert_eq!(bus.cpu_usage(), 0.0);
        assert_eq!(bus.memory_usage(), 0);
    }

    #[test]
    fn test_engine_failure_still_stores_state() {
        let (engine, mut bus) = setup("bus:/Music");
        engine.set_available(false);
        assert!(bus.set_volume(0.5).is_err());
        assert_eq!(bus.volume(), 0.5);
    }
}
