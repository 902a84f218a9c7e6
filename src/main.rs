mod app;
mod config;
mod error;
#[cfg(test)]
mod fixtures;
mod gesture;
mod model_download;
mod mouse;
mod pipeline;
mod screenshot;
mod session;
mod types;
mod ui;

use anyhow::Result;
use config::AppConfig;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env()?;
    log::debug!("{config:?}");

    app::run(&config)
}
