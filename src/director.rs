use crate::config::StudioDesc;
use crate::engine::{AudioEngineHandle, ListenerAttributes};
use crate::error::{Result, StudioError};
use crate::events::StudioEvent;
use crate::math::Vec3;
use crate::mixer::{BusControl, MASTER_BUS};
use crate::playback::{EventInstance, InstanceId};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Lifecycle of an [`AudioDirector`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectorState {
    Uninitialized,
    Initialized,
    ShutDown,
}

/// Owner of every live event instance, the bus table and global parameters.
///
/// `AudioDirector` is the manager game code talks to: it starts and stops
/// events, forwards bus and global-parameter changes to the engine, and once
/// per frame reclaims instances that have stopped.
///
/// # Ownership
///
/// The director exclusively owns its [`EventInstance`]s. Callers receive an
/// [`InstanceId`] and reach the instance through [`instance`](Self::instance)
/// or [`instance_mut`](Self::instance_mut); once the instance is reclaimed
/// those lookups return `None`.
///
/// # Errors
///
/// Misuse (calling before [`initialize`](Self::initialize), redundant state
/// changes, unknown names) is logged and reported as a [`StudioError`]; it
/// never panics. Getters fall back to neutral values.
///
/// # Events
///
/// Lifecycle changes are queued as [`StudioEvent`]s for
/// [`poll_events`](Self::poll_events). The queue holds at most
/// [`StudioDesc::event_queue_capacity`] events; while it is full new events
/// are dropped, so a host that never polls costs a fixed amount of memory.
pub struct AudioDirector {
    desc: StudioDesc,
    engine: Arc<dyn AudioEngineHandle>,
    state: DirectorState,
    /// Live instances in creation order
    active: Vec<EventInstance>,
    buses: HashMap<String, BusControl>,
    global_parameters: HashMap<String, f32>,
    banks: Vec<String>,
    event_sender: Sender<StudioEvent>,
    event_receiver: Receiver<StudioEvent>,
    dropped_events: AtomicUsize,
}

impl AudioDirector {
    pub fn new(desc: StudioDesc, engine: Arc<dyn AudioEngineHandle>) -> Self {
        let (event_sender, event_receiver) =
            crossbeam_channel::bounded(desc.event_queue_capacity.max(1));
        Self {
            desc,
            engine,
            state: DirectorState::Uninitialized,
            active: Vec::new(),
            buses: HashMap::new(),
            global_parameters: HashMap::new(),
            banks: Vec::new(),
            event_sender,
            event_receiver,
            dropped_events: AtomicUsize::new(0),
        }
    }

    pub fn desc(&self) -> &StudioDesc {
        &self.desc
    }

    pub fn state(&self) -> DirectorState {
        self.state
    }

    pub fn is_initialized(&self) -> bool {
        self.state == DirectorState::Initialized
    }

    fn emit(&self, event: StudioEvent) {
        match self.event_sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                // Warn once per full queue, not once per event.
                if self.dropped_events.fetch_add(1, Ordering::Relaxed) == 0 {
                    log::warn!("Studio event queue is full, dropping {:?} and later events", event);
                }
            }
            Err(TrySendError::Disconnected(event)) => {
                log::warn!("Dropped studio event {:?}: queue disconnected", event);
            }
        }
    }

    /// Drains every event queued since the last call.
    pub fn poll_events(&self) -> Vec<StudioEvent> {
        let events = self.event_receiver.try_iter().collect();
        let dropped = self.dropped_events.swap(0, Ordering::Relaxed);
        if dropped > 0 {
            log::warn!("{} studio events were dropped since the last poll", dropped);
        }
        events
    }

    /// Events dropped because the queue was full since the last
    /// [`poll_events`](Self::poll_events).
    pub fn dropped_event_count(&self) -> usize {
        self.dropped_events.load(Ordering::Relaxed)
    }

    fn require_initialized(&self, action: &str) -> Result<()> {
        if self.is_initialized() {
            return Ok(());
        }
        log::warn!("Audio director not initialized. Cannot {}", action);
        Err(StudioError::NotInitialized(action.to_string()))
    }

    /// Brings up the engine and loads the banks listed in the descriptor.
    ///
    /// # Errors
    ///
    /// - [`StudioError::AlreadyInitialized`] if called twice
    /// - [`StudioError::Configuration`] if the descriptor is invalid
    /// - [`StudioError::EngineUnavailable`] if the runtime cannot be started;
    ///   the director stays uninitialized and the host may continue silently
    pub fn initialize(&mut self) -> Result<()> {
        if self.is_initialized() {
            log::warn!("Audio director already initialized");
            return Err(StudioError::AlreadyInitialized);
        }

        log::info!("Initializing audio director...");
        self.desc
            .validate()
            .inspect_err(|e| log::error!("Invalid studio configuration: {}", e))?;

        self.engine.init_system(&self.desc).map_err(|e| {
            log::error!("Failed to initialize audio engine: {}", e);
            match e {
                StudioError::EngineUnavailable(_) => e,
                other => StudioError::EngineUnavailable(other.to_string()),
            }
        })?;

        log::debug!(
            "Runtime flags: studio {:#x}, core {:#x}",
            self.desc.studio_init_flags(),
            self.desc.core_init_flags()
        );
        self.state = DirectorState::Initialized;
        self.emit(StudioEvent::SystemInitialized);

        for bank in self.desc.banks.clone() {
            if let Err(e) = self.load_bank(&bank) {
                log::error!("Failed to load startup bank {}: {}", bank, e);
            }
        }

        log::info!("Audio director initialized successfully");
        Ok(())
    }

    /// Stops and releases every active instance, then shuts the engine down.
    ///
    /// Does nothing unless initialized.
    pub fn shutdown(&mut self) {
        if !self.is_initialized() {
            return;
        }

        log::info!("Shutting down audio director...");
        for instance in std::mem::take(&mut self.active) {
            self.retire(instance, true);
        }

        for bank in std::mem::take(&mut self.banks) {
            if let Err(e) = self.engine.unload_bank(&bank) {
                log::warn!("Failed to unload bank {} during shutdown: {}", bank, e);
            }
        }
        self.buses.clear();
        self.global_parameters.clear();

        if let Err(e) = self.engine.shutdown_system() {
            log::error!("Audio engine shutdown failed: {}", e);
        }

        self.state = DirectorState::ShutDown;
        self.emit(StudioEvent::SystemShutDown);
        log::info!("Audio director shutdown complete");
    }

    /// Stops (if needed) and releases an instance that already left the
    /// registry. Failures are logged and never interrupt the caller's sweep.
    fn retire(&self, mut instance: EventInstance, immediate: bool) {
        let instance_id = instance.id();
        if !instance.is_stopped() {
            if let Err(e) = instance.stop(immediate) {
                log::warn!("Failed to stop event {}: {}", instance.path(), e);
            }
            self.emit(StudioEvent::InstanceStopped {
                instance_id,
                path: instance.path().to_string(),
                immediate,
            });
        }
        if let Err(e) = instance.release() {
            log::warn!("Failed to release event {}: {}", instance.path(), e);
        }
        self.emit(StudioEvent::InstanceReleased { instance_id });
    }

    fn register(&mut self, instance: EventInstance) -> InstanceId {
        let instance_id = instance.id();
        self.emit(StudioEvent::InstanceStarted {
            instance_id,
            path: instance.path().to_string(),
        });
        self.active.push(instance);
        instance_id
    }

    /// Creates an instance, applies parameters and position, then starts
    /// and registers it.
    fn start(
        &mut self,
        path: &str,
        position: Option<Vec3>,
        parameters: &[(&str, f32)],
    ) -> Result<InstanceId> {
        self.require_initialized(&format!("play event {}", path))?;

        log::debug!("Playing event: {}", path);
        let mut instance = EventInstance::create(self.engine.clone(), path)
            .inspect_err(|e| log::error!("Failed to create event {}: {}", path, e))?;
        for (name, value) in parameters {
            if let Err(e) = instance.set_parameter(name, *value) {
                log::warn!("Starting {} without parameter {}: {}", path, name, e);
            }
        }
        if let Some(position) = position {
            if let Err(e) = instance.set_spatial_attributes(position, None) {
                log::warn!("Starting {} without its position: {}", path, e);
            }
        }
        instance.play()?;

        Ok(self.register(instance))
    }

    /// Creates an instance of `path`, starts it and registers it.
    pub fn play_event(&mut self, path: &str) -> Result<InstanceId> {
        self.start(path, None, &[])
    }

    /// [`play_event`](Self::play_event) with the instance placed at
    /// `position`. The position reaches the engine before the start.
    pub fn play_event_at_position(&mut self, path: &str, position: Vec3) -> Result<InstanceId> {
        self.start(path, Some(position), &[])
    }

    /// Fire-and-forget playback with parameters applied before the start.
    ///
    /// The instance is registered like any other so the per-frame sweep
    /// reclaims it once the engine reports it finished.
    pub fn play_one_shot(
        &mut self,
        path: &str,
        position: Option<Vec3>,
        parameters: &[(&str, f32)],
    ) -> Result<InstanceId> {
        self.start(path, position, parameters)
    }

    /// Stops and releases every active instance of `path`.
    ///
    /// Returns how many instances were removed.
    pub fn stop_event(&mut self, path: &str, immediate: bool) -> usize {
        let (matching, remaining): (Vec<_>, Vec<_>) = std::mem::take(&mut self.active)
            .into_iter()
            .partition(|instance| instance.path() == path);
        self.active = remaining;

        let count = matching.len();
        for instance in matching {
            self.retire(instance, immediate);
        }
        if count > 0 {
            log::debug!("Stopped {} instance(s) of {}", count, path);
        }
        count
    }

    /// Stops and releases one instance. Unknown ids are ignored.
    ///
    /// Returns true if the instance was active.
    pub fn stop_event_instance(&mut self, instance_id: InstanceId, immediate: bool) -> bool {
        let Some(index) = self.active.iter().position(|i| i.id() == instance_id) else {
            log::debug!("{} is not active, nothing to stop", instance_id);
            return false;
        };
        let instance = self.active.remove(index);
        self.retire(instance, immediate);
        true
    }

    pub fn instance(&self, instance_id: InstanceId) -> Option<&EventInstance> {
        self.active.iter().find(|i| i.id() == instance_id)
    }

    pub fn instance_mut(&mut self, instance_id: InstanceId) -> Option<&mut EventInstance> {
        self.active.iter_mut().find(|i| i.id() == instance_id)
    }

    /// Active instances in creation order.
    pub fn active_instances(&self) -> impl Iterator<Item = &EventInstance> {
        self.active.iter()
    }

    pub fn active_instance_count(&self) -> usize {
        self.active.len()
    }

    pub fn instances_with_path(&self, path: &str) -> Vec<InstanceId> {
        self.active
            .iter()
            .filter(|i| i.path() == path)
            .map(EventInstance::id)
            .collect()
    }

    pub fn set_global_parameter(&mut self, name: &str, value: f32) -> Result<()> {
        self.require_initialized(&format!("set global parameter {}", name))?;

        log::debug!("Setting global parameter {} to {}", name, value);
        self.global_parameters.insert(name.to_string(), value);
        self.emit(StudioEvent::GlobalParameterChanged {
            name: name.to_string(),
            value,
        });
        self.engine
            .set_global_parameter(name, value)
            .inspect_err(|e| log::error!("Failed to set global parameter {}: {}", name, e))
    }

    /// Last value of a global parameter; 0.0 when unset or not initialized.
    pub fn global_parameter(&self, name: &str) -> f32 {
        if self.require_initialized(&format!("get global parameter {}", name)).is_err() {
            return 0.0;
        }
        if let Some(value) = self.global_parameters.get(name) {
            return *value;
        }
        self.engine.global_parameter(name).unwrap_or_else(|e| {
            log::debug!("Global parameter {} unavailable: {}", name, e);
            0.0
        })
    }

    /// Existing control for `path`, if it has been referenced before.
    pub fn bus(&self, path: &str) -> Option<&BusControl> {
        self.buses.get(path)
    }

    /// Control for `path`, created on first use.
    pub fn bus_mut(&mut self, path: &str) -> Result<&mut BusControl> {
        self.require_initialized(&format!("access bus {}", path))?;
        let engine = &self.engine;
        Ok(self
            .buses
            .entry(path.to_string())
            .or_insert_with(|| BusControl::new(path, engine.clone())))
    }

    fn apply_to_bus<F>(&mut self, path: &str, apply: F) -> Result<()>
    where
        F: FnOnce(&mut BusControl) -> Result<()>,
    {
        let bus = self.bus_mut(path)?;
        let result = apply(bus);
        let event = StudioEvent::BusChanged {
            path: path.to_string(),
            volume: bus.volume(),
            muted: bus.is_muted(),
            paused: bus.is_paused(),
        };
        self.emit(event);
        result
    }

    /// Sets a bus volume, clamped to `[0, 1]`.
    pub fn set_bus_volume(&mut self, path: &str, volume: f32) -> Result<()> {
        self.apply_to_bus(path, |bus| bus.set_volume(volume))
    }

    pub fn set_bus_muted(&mut self, path: &str, muted: bool) -> Result<()> {
        self.apply_to_bus(path, |bus| bus.set_muted(muted))
    }

    pub fn set_bus_paused(&mut self, path: &str, paused: bool) -> Result<()> {
        self.apply_to_bus(path, |bus| bus.set_paused(paused))
    }

    /// Stops every event routed through `path`.
    ///
    /// Affected instances notice on the next [`tick`](Self::tick).
    pub fn stop_bus(&mut self, path: &str, immediate: bool) -> Result<()> {
        self.bus_mut(path)?.stop_all_events(immediate)
    }

    pub fn mute_all_events(&mut self) -> Result<()> {
        self.set_bus_muted(MASTER_BUS, true)
    }

    pub fn unmute_all_events(&mut self) -> Result<()> {
        self.set_bus_muted(MASTER_BUS, false)
    }

    pub fn pause_all_events(&mut self) -> Result<()> {
        self.set_bus_paused(MASTER_BUS, true)
    }

    pub fn resume_all_events(&mut self) -> Result<()> {
        self.set_bus_paused(MASTER_BUS, false)
    }

    pub fn load_bank(&mut self, path: &str) -> Result<()> {
        self.require_initialized(&format!("load bank {}", path))?;
        if self.banks.iter().any(|b| b == path) {
            log::warn!("Bank {} is already loaded", path);
            return Err(StudioError::InvalidState(format!(
                "bank {} is already loaded",
                path
            )));
        }
        self.engine
            .load_bank(path)
            .inspect_err(|e| log::error!("Failed to load bank {}: {}", path, e))?;
        log::info!("Loaded bank {}", path);
        self.banks.push(path.to_string());
        self.emit(StudioEvent::BankLoaded {
            path: path.to_string(),
        });
        Ok(())
    }

    pub fn unload_bank(&mut self, path: &str) -> Result<()> {
        self.require_initialized(&format!("unload bank {}", path))?;
        let Some(index) = self.banks.iter().position(|b| b == path) else {
            log::warn!("Bank {} is not loaded", path);
            return Err(StudioError::NotFound(format!("bank {} is not loaded", path)));
        };
        self.banks.remove(index);
        self.emit(StudioEvent::BankUnloaded {
            path: path.to_string(),
        });
        self.engine
            .unload_bank(path)
            .inspect_err(|e| log::error!("Failed to unload bank {}: {}", path, e))
    }

    pub fn loaded_banks(&self) -> &[String] {
        &self.banks
    }

    /// Places listener `index`; indices at or past
    /// [`StudioDesc::listener_count`] are rejected.
    pub fn set_listener_attributes(
        &mut self,
        index: usize,
        attributes: ListenerAttributes,
    ) -> Result<()> {
        self.require_initialized("set listener attributes")?;
        if index >= self.desc.listener_count {
            log::warn!(
                "Listener {} out of range ({} configured)",
                index,
                self.desc.listener_count
            );
            return Err(StudioError::NotFound(format!(
                "listener {} does not exist",
                index
            )));
        }
        self.engine
            .set_listener_attributes(index, &attributes)
            .inspect_err(|e| log::error!("Failed to place listener {}: {}", index, e))
    }

    /// Per-frame maintenance.
    ///
    /// Pumps the engine, lets each instance notice natural completion, then
    /// releases and removes every stopped instance. Returns how many were
    /// removed. Must run once per frame, after that frame's user calls.
    pub fn tick(&mut self) -> usize {
        if !self.is_initialized() {
            return 0;
        }

        if let Err(e) = self.engine.update() {
            log::error!("Audio engine update failed: {}", e);
        }

        let completed: Vec<StudioEvent> = self
            .active
            .iter_mut()
            .filter_map(|instance| {
                instance
                    .poll_completion()
                    .then(|| StudioEvent::InstanceCompleted {
                        instance_id: instance.id(),
                        path: instance.path().to_string(),
                    })
            })
            .collect();
        for event in completed {
            self.emit(event);
        }

        let (stopped, live): (Vec<_>, Vec<_>) = std::mem::take(&mut self.active)
            .into_iter()
            .partition(EventInstance::is_stopped);
        self.active = live;

        let pruned = stopped.len();
        for instance in stopped {
            self.retire(instance, false);
        }
        if pruned > 0 {
            log::debug!(
                "Pruned {} stopped instance(s), {} still active",
                pruned,
                self.active.len()
            );
        }
        pruned
    }
}

impl Drop for AudioDirector {
    fn drop(&mut self) {
        self.shutdown();
    }
}
