use std::fs::File;
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use tracing::info;
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

mod controller;
mod domain;
mod form;
mod inputter;
mod loader;
mod model;
mod page;
mod preview;
mod records;
mod repository;
mod table;
mod ui;

use controller::Controller;
use domain::{Args, WardConfig, WardError};
use model::{Model, Status};
use ui::WardUI;

fn main() -> ExitCode {
    let args = Args::parse();
    let result = run(args);
    ratatui::restore();
    match result {
        Err(e) => {
            eprintln!("Error: {e}");
            if let Some(trace) = e.span_trace() {
                eprintln!("{trace}");
            }
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn run(args: Args) -> Result<(), WardError> {
    let config = WardConfig::try_from(args)?;
    init_logging(&config)?;
    info!("Starting ward as {}", config.role.label());

    let mut model = Model::init(&config)?;
    let mut ui = WardUI::new();
    let controller = Controller::new(&config);

    let mut terminal = ratatui::try_init()?;
    while model.status != Status::QUITTING {
        // Render the current view
        terminal.draw(|f| ui.draw(&model, f))?;

        // Handle events and map to a Message. Ticks without input still let
        // finished file previews through.
        let message = controller.handle_event(&model)?;
        model.update(message)?;
    }
    info!("Quitting ward");
    Ok(())
}

/// Logs go to a file, the terminal belongs to the ui.
fn init_logging(config: &WardConfig) -> Result<(), WardError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| WardError::LoggingFailed(e.to_string()))?;
    let file = File::create(&config.log_file)?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .with(ErrorLayer::default())
        .try_init()
        .map_err(|e| WardError::LoggingFailed(e.to_string()))
}
