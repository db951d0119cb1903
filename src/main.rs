use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use teacher_report_ivr::app::{self, AppStateBuilder};
use teacher_report_ivr::config::{Cli, Config};
use tokio::select;
use tracing::{info, level_filters::LevelFilter};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config = match cli.conf {
        Some(conf) if std::path::Path::new(&conf).exists() => Config::load(&conf)
            .with_context(|| format!("Failed to load config {}", conf))?,
        _ => Config::default(),
    };

    let mut log_fmt = tracing_subscriber::fmt();
    if let Some(ref level) = config.log_level {
        if let Ok(lv) = level.as_str().parse::<LevelFilter>() {
            log_fmt = log_fmt.with_max_level(lv);
        }
    }

    // keeps the non-blocking writer flushing until main returns
    let mut _guard = None;
    if let Some(ref log_file) = config.log_file {
        let file = File::create(log_file)
            .with_context(|| format!("Failed to create log file {}", log_file))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        _guard = Some(guard);
        log_fmt.with_writer(non_blocking).try_init().ok();
    } else {
        log_fmt.try_init().ok();
    }

    let state = AppStateBuilder::new().config(config).build().await?;

    info!(
        "Starting teacher-report-ivr on {} ({})",
        state.config.http_addr, state.config.timezone
    );
    select! {
        result = app::run(state.clone()) => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received CTRL+C, shutting down");
            state.token.cancel();
        }
    }
    Ok(())
}
