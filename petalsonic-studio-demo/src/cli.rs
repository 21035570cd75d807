use anyhow::{Context, Result, bail};
use petalsonic_studio::{
    EmitterConfig, HeadlessEngine, ListenerAttributes, Pose, StudioDesc, StudioEvent, StudioWorld,
    Vec2, Vec3,
};
use std::sync::Arc;

const FRAME: f32 = 1.0 / 60.0;

pub fn run_cli_tests() -> Result<()> {
    for name in ["basic", "spatial", "buses"] {
        run_scenario(name)?;
    }
    Ok(())
}

pub fn run_scenario(name: &str) -> Result<()> {
    log::info!("=== Running {} scenario ===", name);
    match name {
        "basic" => basic_playback(),
        "spatial" => spatial_emitters(),
        "buses" => buses_and_globals(),
        other => bail!("unknown scenario {:?} (expected basic, spatial, buses or all)", other),
    }
}

fn new_world(desc: StudioDesc) -> Result<(Arc<HeadlessEngine>, StudioWorld)> {
    let engine = Arc::new(HeadlessEngine::new());
    let mut world = StudioWorld::new(desc, engine.clone());
    world
        .initialize()
        .context("Failed to initialize audio director")?;
    Ok((engine, world))
}

fn drain_events(world: &StudioWorld) {
    let events = world.director().poll_events();
    let instance_events = events.iter().filter(|e| e.is_instance_event()).count();
    for event in events {
        match event {
            StudioEvent::InstanceCompleted { path, .. } => log::info!("Completed: {}", path),
            other if other.is_system_event() => log::info!("System: {:?}", other),
            other => log::debug!("Studio event: {:?}", other),
        }
    }
    log::info!("{} instance event(s) drained", instance_events);
}

fn basic_playback() -> Result<()> {
    let (engine, mut world) = new_world(StudioDesc::default().bank("Master.bank"))?;

    let music = world.director_mut().play_event("event:/Music/MainTheme")?;
    log::info!("Music started as {}", music);

    let director = world.director_mut();
    let instance = director
        .instance_mut(music)
        .context("music instance vanished")?;
    instance.set_parameter("Intensity", 0.5)?;
    instance.pause()?;
    log::info!("Paused at {}ms", instance.timeline_position());
    instance.resume()?;

    // Two overlapping hits share a path; one bulk stop ends both.
    director.play_event("event:/SFX/Hit")?;
    director.play_event("event:/SFX/Hit")?;
    let stopped = director.stop_event("event:/SFX/Hit", true);
    log::info!("Bulk stop removed {} hit(s)", stopped);

    // A one-shot that ends on its own is reclaimed by the sweep.
    let footstep = director.play_one_shot("event:/SFX/Footstep", None, &[("Surface", 1.0)])?;
    for instance in director.active_instances() {
        log::info!("Active: {} ({})", instance.path(), instance.id());
    }
    if let Some(handle) = director.instance(footstep).and_then(|i| i.handle()) {
        log::info!("Finishing native event {}", handle.raw());
        engine.finish_event(handle);
    }
    let pruned = world.advance(FRAME);
    log::info!("Sweep reclaimed {} instance(s)", pruned);
    drain_events(&world);

    world.shutdown();
    log::info!("Native events left after shutdown: {}", engine.live_event_count());
    Ok(())
}

fn spatial_emitters() -> Result<()> {
    let (engine, mut world) = new_world(StudioDesc::default())?;

    world.director_mut().set_listener_attributes(
        0,
        ListenerAttributes::new(Pose::from_position(Vec3::ZERO)),
    )?;

    let car = world.add_emitter_at(
        EmitterConfig::volumetric("event:/SFX/Engine").auto_play(true),
        Vec3::new(-10.0, 0.0, -5.0),
    );
    let torch = world.add_emitter(EmitterConfig::planar("event:/Ambience/Torch").auto_play(true));
    world.set_emitter_planar_position(torch, Vec2::new(4.0, 2.0))?;
    if let Some(emitter) = world.emitter(torch) {
        log::info!(
            "Torch is planar: {}, engine position {:?}",
            emitter.config().is_planar(),
            emitter.world_position()
        );
    }

    for frame in 0..120 {
        let x = -10.0 + frame as f32 * 20.0 / 120.0;
        world.set_emitter_position(car, Vec3::new(x, 0.0, -5.0))?;
        world.advance(FRAME);
    }

    let instance_id = world
        .emitter(car)
        .and_then(|e| e.instance_id())
        .context("car emitter is not playing")?;
    if let Some(instance) = world.director().instance(instance_id) {
        log::info!(
            "Car at {:?} moving {:?}",
            instance.position(),
            instance.velocity()
        );
    }

    world.remove_emitter(car);
    world.advance(FRAME);
    drain_events(&world);
    log::info!(
        "{} instance(s) still active, {} native event(s)",
        world.director().active_instance_count(),
        engine.live_event_count()
    );

    world.shutdown();
    Ok(())
}

fn buses_and_globals() -> Result<()> {
    let (engine, mut world) = new_world(StudioDesc::default())?;
    engine.route_event("event:/SFX/Hit", "bus:/SFX");
    engine.set_bus_diagnostics("bus:/SFX", 1.5, 256 * 1024);

    let director = world.director_mut();
    director.set_global_parameter("TimeOfDay", 18.0)?;
    director.set_bus_volume("bus:/Music", 1.4)?;
    director.set_bus_paused("bus:/Ambience", true)?;
    director.play_event("event:/SFX/Hit")?;
    director.play_event("event:/Music/MainTheme")?;
    director.stop_bus("bus:/SFX", false)?;

    if let Some(bus) = director.bus("bus:/SFX") {
        log::info!(
            "bus:/SFX uses {:.1}% CPU and {} bytes",
            bus.cpu_usage(),
            bus.memory_usage()
        );
    }
    log::info!(
        "bus:/Music volume {:?}, TimeOfDay {}",
        director.bus("bus:/Music").map(|b| b.volume()),
        director.global_parameter("TimeOfDay")
    );

    let pruned = world.advance(FRAME);
    log::info!("Stopping bus:/SFX reclaimed {} instance(s)", pruned);
    drain_events(&world);

    world.shutdown();
    Ok(())
}
