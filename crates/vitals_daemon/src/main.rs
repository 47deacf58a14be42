use std::io::BufWriter;
use std::time::Duration;

use clap::{Arg, Command};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod context;
mod drivers;
mod session;
mod sink;

use session::Session;
use sink::PlotSink;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries the plot-line stream
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vitals_daemon=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("vitals daemon starting...");

    // --- Argument Parsing ---
    let matches = Command::new("vitals_daemon")
        .about("Physiological signal acquisition and processing daemon")
        .arg(
            Arg::new("mock")
                .long("mock")
                .action(clap::ArgAction::SetTrue)
                .help("Use synthetic sensor data instead of real hardware"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .default_value("./config.json")
                .help("Path to the JSON configuration file"),
        )
        .arg(
            Arg::new("duration")
                .long("duration")
                .value_parser(clap::value_parser!(u64))
                .default_value("180")
                .help("Session length in seconds; 0 runs until interrupted"),
        )
        .get_matches();

    let config_path = matches.get_one::<String>("config").unwrap();
    let cfg = config::load_config(config_path)?;
    let use_mock = matches.get_flag("mock");
    let duration = Duration::from_secs(*matches.get_one::<u64>("duration").unwrap());

    let mut sink = PlotSink::new(BufWriter::new(std::io::stdout()), cfg.output.decimation);
    let mut session = Session::new(cfg, use_mock)?;

    session.run(&mut sink, duration).await?;
    session.shutdown();

    tracing::info!("vitals daemon stopped gracefully");
    Ok(())
}
