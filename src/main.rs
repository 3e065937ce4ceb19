//! A small control panel for display brightness

mod armaf;
mod config;
mod control;
mod external;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use config::{BackendKind, Config};
use control::panel::PanelController;
use external::display::{mock::MockDisplayBackend, xrandr::XrandrBackend, DisplayBackend};
use flexi_logger::Logger;
use std::path::PathBuf;
use tokio::io::BufReader;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Adjust display brightness through xrandr")]
struct Opts {
    /// Log debug information, including every xrandr invocation
    #[clap(short, long)]
    debug: bool,

    /// Configuration file to use instead of the default one
    #[clap(short, long, parse(from_os_str))]
    config: Option<PathBuf>,

    /// Backend driving the displays, overrides the configuration file
    #[clap(long, arg_enum)]
    backend: Option<BackendKind>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let opts = Opts::parse();
    let _logger = Logger::try_with_env_or_str(if opts.debug { "debug" } else { "info" })?
        .start()
        .context("Couldn't start logger")?;
    log_panics::init();

    let mut config = Config::load(opts.config.as_deref())?;
    if let Some(backend) = opts.backend {
        config.backend = backend;
    }
    log::debug!("Using {:?}", config);

    match config.backend {
        BackendKind::Xrandr => {
            let backend = XrandrBackend::new(&config.xrandr_path, opts.debug);
            run_panel(backend, &config).await
        }
        BackendKind::Mock => {
            log::info!("Using simulated outputs, no brightness will actually change");
            let backend =
                MockDisplayBackend::with_outputs(config.mock.outputs.clone(), config.mock_brightness());
            run_panel(backend, &config).await
        }
    }
}

async fn run_panel<B: DisplayBackend>(backend: B, config: &Config) -> Result<()> {
    let (controller, state) = PanelController::new(backend, config.fallback_brightness());
    ui::console::run(
        controller,
        state,
        config.nudge_step,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await
}
