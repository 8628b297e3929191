use anyhow::{Context, Result};
use tracing::info;

use slv_physics::app::{App, AppConfig};
use slv_physics::utils::logging::init_logging;
use slv_physics::{APP_NAME, VERSION};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    info!("{} {} starting", APP_NAME, VERSION);

    let config = AppConfig::from_args(std::env::args().skip(1))?;
    let mut app = App::new(config).await?;
    let snapshot = app.run().await?;

    let report = serde_json::to_string_pretty(&snapshot).context("Failed to encode final snapshot")?;
    println!("{}", report);
    info!("Simulated {:.2}s over {} frames", snapshot.simulated_time, snapshot.frame);
    Ok(())
}
