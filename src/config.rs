use crate::flow::{FlowOptions, FlowParams};
use crate::modes::Mode;
use clap::{ArgAction, Parser};

/// Live camera viewer with selectable image-processing modes.
#[derive(Parser, Debug)]
#[command(name = "vision-modes", version)]
#[command(after_help = "KEYS:
    0-9      switch mode (same as clicking a button)
    Esc, q   quit")]
pub struct Cli {
    /// Camera index (0 = default webcam).
    #[arg(long, default_value_t = 0)]
    pub device: u32,

    /// Working frame width; camera frames are resized to this.
    #[arg(long, default_value_t = 1280, value_parser = clap::value_parser!(u32).range(1..=7680))]
    pub width: u32,

    /// Working frame height.
    #[arg(long, default_value_t = 960, value_parser = clap::value_parser!(u32).range(1..=4320))]
    pub height: u32,

    /// Frame rate requested from the camera.
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u32).range(1..=120))]
    pub fps: u32,

    /// Shortest displacement (pixels) that still gets a flow arrow.
    #[arg(long, default_value_t = 1.5, value_parser = positive_pixels)]
    pub min_motion: f32,

    /// Spacing of the flow arrow grid in pixels.
    #[arg(long, default_value_t = 15, value_parser = clap::value_parser!(u64).range(1..))]
    pub flow_stride: u64,

    /// Mode to start in; anything outside 0-9 shows the raw feed.
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    pub mode: i32,

    /// More log output (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ViewerConfig {
    pub device: u32,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub initial_mode: Mode,
    pub flow: FlowOptions,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            device: 0,
            width: 1280,
            height: 960,
            fps: 30,
            initial_mode: Mode::Passthrough,
            flow: FlowOptions::default(),
        }
    }
}

impl From<&Cli> for ViewerConfig {
    fn from(cli: &Cli) -> Self {
        Self {
            device: cli.device,
            width: cli.width,
            height: cli.height,
            fps: cli.fps,
            initial_mode: Mode::from_id(cli.mode),
            flow: FlowOptions {
                params: FlowParams::default(),
                min_motion: cli.min_motion,
                stride: cli.flow_stride as usize,
            },
        }
    }
}

fn positive_pixels(s: &str) -> Result<f32, String> {
    let v: f32 = s.parse().map_err(|e| format!("{e}"))?;
    if v.is_finite() && v > 0.0 {
        Ok(v)
    } else {
        Err(format!("expected a positive number of pixels, got {s}"))
    }
}

impl Cli {
    /// `-v` count to a log filter: none is info, one is debug, more is trace.
    pub fn log_level(&self) -> log::LevelFilter {
        match self.verbose {
            0 => log::LevelFilter::Info,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}
