//! Event types for PetalSonic Studio
//!
//! The director publishes a [`StudioEvent`] for every lifecycle change it
//! performs. Hosts drain them once per frame with
//! [`AudioDirector::poll_events`](crate::AudioDirector::poll_events).

use crate::playback::InstanceId;

#[derive(Debug, Clone, PartialEq)]
pub enum StudioEvent {
    SystemInitialized,
    SystemShutDown,
    InstanceStarted {
        instance_id: InstanceId,
        path: String,
    },
    /// Stopped by the host, either directly or through a bulk stop
    InstanceStopped {
        instance_id: InstanceId,
        path: String,
        immediate: bool,
    },
    /// The engine reported that the instance finished on its own
    InstanceCompleted {
        instance_id: InstanceId,
        path: String,
    },
    InstanceReleased {
        instance_id: InstanceId,
    },
    BusChanged {
        path: String,
        volume: f32,
        muted: bool,
        paused: bool,
    },
    GlobalParameterChanged {
        name: String,
        value: f32,
    },
    BankLoaded {
        path: String,
    },
    BankUnloaded {
        path: String,
    },
}

impl StudioEvent {
    pub fn instance_id(&self) -> Option<InstanceId> {
        match self {
            Self::InstanceStarted { instance_id, .. }
            | Self::InstanceStopped { instance_id, .. }
            | Self::InstanceCompleted { instance_id, .. }
            | Self::InstanceReleased { instance_id } => Some(*instance_id),
            _ => None,
        }
    }

    pub fn is_instance_event(&self) -> bool {
        self.instance_id().is_some()
    }

    pub fn is_system_event(&self) -> bool {
        matches!(self, Self::SystemInitialized | Self::SystemShutDown)
    }
}
