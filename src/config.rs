//! Configuration for PetalSonic Studio

mod emitter_config;
mod studio_desc;

pub use emitter_config::{EmitterConfig, EmitterSpace};
pub use studio_desc::{
    INIT_3D_RIGHT_HANDED, STUDIO_INIT_ALLOW_MISSING_PLUGINS, STUDIO_INIT_LIVE_UPDATE,
    STUDIO_INIT_SYNCHRONOUS_UPDATE, SpeakerMode, StudioDesc,
};
