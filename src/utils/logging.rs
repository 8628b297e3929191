use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};
use std::env;
use std::fs;

use crate::config::PhysicsSettings;

const LOG_FILE_ENV: &str = "SLV_PHYSICS_LOG_FILE";

/// Initialize logging with console output and an optional log file.
///
/// `RUST_LOG` takes precedence; otherwise `info` with debug output for this
/// crate. Set `SLV_PHYSICS_LOG_FILE` to also write plain-text logs to a file.
pub fn init_logging() {
    let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let enable_backtrace = env::var("RUST_BACKTRACE").unwrap_or_else(|_| "0".to_string()) == "1";
    let log_path = env::var(LOG_FILE_ENV).ok();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
            let filter = EnvFilter::new(&log_level);
            match "slv_physics=debug".parse() {
                Ok(directive) => filter.add_directive(directive),
                Err(_) => filter,
            }
        });

    let file_layer = log_path.as_ref().and_then(|path| match fs::File::create(path) {
        Ok(file) => Some(
            fmt::layer()
                .with_writer(file)
                .with_span_events(FmtSpan::CLOSE)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false), // No ANSI codes in file
        ),
        Err(e) => {
            eprintln!("Warning: Failed to create log file {}: {}", path, e);
            None
        }
    });

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer()
            .with_span_events(FmtSpan::CLOSE)
            .with_target(true)
            .with_thread_names(true)
            .with_ansi(true)
        )
        .with(file_layer);

    if let Err(e) = subscriber.try_init() {
        eprintln!("Warning: Logging already initialized: {}", e);
        return;
    }

    std::panic::set_hook(Box::new(move |panic_info| {
        tracing::error!("Panic occurred: {}", panic_info);

        if let Some(location) = panic_info.location() {
            tracing::error!(
                "Panic location: {}:{}:{}",
                location.file(),
                location.line(),
                location.column()
            );
        }

        if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            tracing::error!("Panic payload: {}", s);
        }

        if enable_backtrace {
            tracing::error!("Backtrace:\n{:?}", std::backtrace::Backtrace::capture());
        }
    }));

    tracing::info!("Logging initialized with level: {}", log_level);
    match &log_path {
        Some(path) => tracing::info!("File logging enabled: {}", path),
        None => tracing::debug!("File logging disabled, set {} to enable", LOG_FILE_ENV),
    }
    tracing::info!("Backtrace enabled: {}", enable_backtrace);
}

/// Log the physics configuration in effect
pub fn log_physics_settings(settings: &PhysicsSettings) {
    tracing::info!("=== Physics Settings ===");
    tracing::info!("Gravity: {:?}", settings.gravity);
    tracing::info!(
        "Timestep: clamp below {} Hz, sub-step below {} Hz ({} sub-steps)",
        settings.timing.min_timestep_hz,
        settings.timing.substep_threshold_hz,
        settings.timing.slow_frame_sub_steps
    );
    tracing::info!("Convex radius: {}", settings.shapes.convex_radius);
    tracing::info!(
        "Default material: restitution {}, friction {}, density {}",
        settings.materials.restitution,
        settings.materials.friction,
        settings.materials.density
    );
    tracing::info!("========================");
}
