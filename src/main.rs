// What you SEE:
// • The live camera feed, with ten buttons stacked down the left edge.
// • Click a button (or press 0-9) to switch the view: grayscale, Sobel X/Y,
//   blur, optical-flow arrows, Canny edges, Laplacian, threshold,
//   gradient magnitude, blue color mask.
// • ESC or q quits.

mod app;
mod camera;
mod config;
mod dispatch;
mod draw;
mod error;
mod flow;
mod input;
mod modes;
mod overlay;
mod types;
mod vision;
mod window;

#[cfg(test)]
mod testing;

use camera::CameraCapture;
use clap::Parser;
use config::{Cli, ViewerConfig};
use error::Error;
use std::process::ExitCode;
use window::Drawer;

const WINDOW_TITLE: &str = "Vision Modes";

fn main() -> ExitCode {
    let cli = Cli::parse();
    env_logger::Builder::new().filter_level(cli.log_level()).init();
    let config = ViewerConfig::from(&cli);

    exit_code(run(&config))
}

/// Errors are reported once, through the logger, then mapped to a failing exit.
fn exit_code(result: Result<(), Error>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &ViewerConfig) -> Result<(), Error> {
    /* --- Camera + window setup ---
       Visual: window opens; the first camera frame decides whether we go on. */
    let cam = CameraCapture::new(config.device, config.width, config.height, config.fps)?;
    let drawer = Drawer::new(WINDOW_TITLE, config.width as usize, config.height as usize)?;

    let summary = app::run(cam, drawer, config)?;
    log::info!(
        "Bye: {} frames, last mode {}{}",
        summary.ticks,
        summary.final_mode.label(),
        if summary.quit_requested { " (quit)" } else { " (stream ended)" }
    );
    Ok(())
}
