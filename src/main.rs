//! lamco-pointer demo
//!
//! Replays a scripted input session (mouse, animated icon, touch spots,
//! inactivity fade) against the headless collaborators and logs what the
//! simulated compositor ends up showing.

use std::f32::consts::TAU;
use std::fs::File;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::time::sleep;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use lamco_pointer::config::{Config, DemoConfig};
use lamco_pointer::pointer::{
    buttons, IdBits, InactivityTimeout, PointerController, PointerCoords, Presentation,
    Transition, Viewport,
};
use lamco_pointer::sim::{icons, spawn_vsync, RecordingSpriteController, StaticIconPolicy};

/// Command-line arguments for lamco-pointer-demo
#[derive(Parser, Debug)]
#[command(name = "lamco-pointer-demo")]
#[command(version, about = "Pointer and touch-spot presentation demo", long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "lamco-pointer.toml")]
    pub config: String,

    /// Display to drive
    #[arg(short, long, env = "LAMCO_POINTER_DISPLAY")]
    pub display: Option<i32>,

    /// Animation frame interval in milliseconds
    #[arg(long, env = "LAMCO_POINTER_FRAME_MS")]
    pub frame_interval_ms: Option<u64>,

    /// Pace animation with the loop's timer instead of simulated vsync
    #[arg(long)]
    pub no_vsync: bool,

    /// Verbose logging (can be specified multiple times)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log format (json|pretty|compact)
    #[arg(long, default_value = "pretty")]
    pub log_format: String,

    /// Write logs to file (in addition to stdout)
    #[arg(long)]
    pub log_file: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args)?;

    info!("════════════════════════════════════════════════════════");
    info!("  lamco-pointer-demo v{}", env!("CARGO_PKG_VERSION"));
    info!("  Built: {} {}", env!("BUILD_DATE"), env!("BUILD_TIME"));
    info!("  Commit: {}", env!("GIT_HASH"));
    info!("════════════════════════════════════════════════════════");

    let config = Config::load(&args.config).or_else(|e| {
        tracing::warn!("Failed to load config: {:#}, using defaults", e);
        Config::default_config()
    })?;
    let config = config.with_overrides(args.display, args.frame_interval_ms);
    config.validate()?;
    debug!("Config: {:?}", config);

    let policy = Arc::new(StaticIconPolicy::new());
    let sprites = Arc::new(RecordingSpriteController::new());

    let vsync = (!args.no_vsync).then(|| spawn_vsync(config.demo.vsync_interval()));
    let (pulses, vsync_task) = match vsync {
        Some((pulses, task)) => (Some(pulses), Some(task)),
        None => (None, None),
    };

    let (pointer, loop_task) =
        PointerController::spawn(policy, sprites.clone(), config.pointer.clone(), pulses)
            .context("Failed to start pointer controller")?;

    run_session(&pointer, &sprites, &config.demo).await;

    let snapshot = pointer.snapshot();
    info!(
        "Session finished: pointer {:?} at ({:.1}, {:.1}), {} spots, {} sprites parked",
        snapshot.fade_state,
        snapshot.position.0,
        snapshot.position.1,
        snapshot.spots.len(),
        snapshot.recycled_sprites
    );

    drop(pointer);
    loop_task.await.context("Pointer loop panicked")?;
    if let Some(task) = vsync_task {
        task.abort();
    }

    info!(
        "Sprites acquired: {}, released: {}, render transactions: {}",
        sprites.acquired(),
        sprites.released(),
        sprites.transactions()
    );
    Ok(())
}

async fn run_session(
    pointer: &PointerController,
    sprites: &RecordingSpriteController,
    demo: &DemoConfig,
) {
    let step = demo.step_interval();
    let (width, height) = (demo.width as f32, demo.height as f32);

    info!("Phase 1: mouse");
    pointer.set_display_viewport(Viewport::new(demo.display_id, 0, 0, demo.width, demo.height));
    pointer.unfade(Transition::Animated);
    for i in 0..50 {
        let angle = TAU * i as f32 / 50.0;
        pointer.move_by(angle.cos() * width / 60.0, angle.sin() * height / 60.0);
        if i == 20 {
            pointer.set_button_state(buttons::PRIMARY);
        } else if i == 30 {
            pointer.set_button_state(0);
        }
        sleep(step).await;
    }
    log_sprites("after mouse phase", sprites);

    info!("Phase 2: animated icon");
    pointer.update_pointer_icon(icons::WAIT);
    sleep(Duration::from_millis(icons::WAIT_FRAME_MS * 5 + 50)).await;
    info!(
        "Busy icon at frame {:?}",
        pointer.snapshot().animation_frame
    );
    pointer.update_pointer_icon(icons::HAND);
    sleep(step).await;

    info!("Phase 3: touch spots");
    pointer.set_presentation(Presentation::Spot);
    let contacts = demo.touch_contacts.max(1);
    let id_to_index: Vec<u32> = (0..contacts).collect();
    for frame in 0..30 {
        let live = if frame < 20 {
            contacts
        } else {
            contacts.saturating_sub((frame - 20) / 3)
        };
        let coords: Vec<PointerCoords> = (0..contacts)
            .map(|c| {
                let t = frame as f32 / 30.0;
                PointerCoords::new(
                    width * (0.2 + 0.2 * c as f32) + 100.0 * t,
                    height * 0.5 + 50.0 * (TAU * t).sin(),
                    if frame % 10 < 5 { 1.0 } else { 0.0 },
                )
            })
            .collect();
        let ids: Vec<u32> = (0..live).collect();
        pointer.set_spots(&coords, &id_to_index, IdBits::with_ids(&ids), demo.display_id);
        sleep(step).await;
    }
    log_sprites("while touching", sprites);
    pointer.clear_spots(demo.display_id);
    sleep(Duration::from_millis(
        pointer.config().spot_fade_duration_ms + 100,
    ))
    .await;
    log_sprites("after lift-off", sprites);

    info!("Phase 4: inactivity");
    pointer.set_presentation(Presentation::Pointer);
    pointer.set_inactivity_timeout(InactivityTimeout::Short);
    pointer.move_by(1.0, 1.0);
    let config = pointer.config();
    sleep(Duration::from_millis(
        config.inactivity_timeout_short_ms + config.pointer_fade_duration_ms + 200,
    ))
    .await;
    info!("Pointer after idle period: {:?}", pointer.fade_state());
}

fn log_sprites(label: &str, sprites: &RecordingSpriteController) {
    let visible = sprites.visible_sprites();
    info!("{} sprites visible {}", visible.len(), label);
    for (id, record) in visible {
        debug!(
            "  {} layer={} at ({:.1}, {:.1}) alpha={:.2} icon={:?}",
            id,
            record.layer,
            record.x,
            record.y,
            record.alpha,
            record.icon.map(|icon| icon.style)
        );
    }
}

fn init_logging(args: &Args) -> Result<()> {
    let log_level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "lamco_pointer={level},lamco_pointer_demo={level},warn",
            level = log_level
        ))
    });

    let stdout_layer = match args.log_format.as_str() {
        "json" => tracing_subscriber::fmt::layer().json().boxed(),
        "compact" => tracing_subscriber::fmt::layer().compact().boxed(),
        _ => tracing_subscriber::fmt::layer().pretty().boxed(),
    };

    // If log file is specified, write to both stdout and file
    let file_layer = match &args.log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file: {}", path))?;
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(Arc::new(file))
                .with_ansi(false);
            Some(if args.log_format == "json" {
                layer.json().boxed()
            } else {
                layer.boxed()
            })
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    if let Some(path) = &args.log_file {
        info!("Logging to file: {}", path);
    }
    Ok(())
}
