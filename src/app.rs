// The display loop: capture -> dispatch -> overlay -> present -> input.
// Runs on one thread; the only fan-out is inside the optical-flow renderer.

use crate::camera::FrameSource;
use crate::config::ViewerConfig;
use crate::dispatch::render;
use crate::error::Error;
use crate::input::{AppState, Control};
use crate::modes::Mode;
use crate::overlay::draw_overlay;
use crate::window::Presenter;
use std::sync::mpsc;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped,
}

/// What happened over the life of one loop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoopSummary {
    pub ticks: u64,
    pub final_mode: Mode,
    pub total_arrows: u64,
    pub quit_requested: bool,
}

/// Frames per second, reported once a second.
struct FpsCounter {
    last: Instant,
    frames: u32,
}

impl FpsCounter {
    fn new() -> Self {
        Self { last: Instant::now(), frames: 0 }
    }

    fn tick(&mut self) {
        self.frames += 1;
        let now = Instant::now();
        let elapsed = now.duration_since(self.last);
        if elapsed >= Duration::from_secs(1) {
            log::debug!("FPS: {:.1}", self.frames as f32 / elapsed.as_secs_f32());
            self.frames = 0;
            self.last = now;
        }
    }
}

/// Drive the viewer until the source runs dry or a quit arrives.
/// The source and presenter are dropped (camera released, window closed)
/// when this returns.
pub fn run<S, P>(mut source: S, mut presenter: P, config: &ViewerConfig) -> Result<LoopSummary, Error>
where
    S: FrameSource,
    P: Presenter,
{
    let first = source.next_frame().ok_or(Error::NoInitialFrame)?;
    let mut prev_gray = first.to_gray();
    let mut pending = Some(first);

    let (tx, rx) = mpsc::channel();
    let mut app = AppState::new(config.initial_mode);
    let mut state = LoopState::Running;
    let mut summary = LoopSummary {
        ticks: 0,
        final_mode: app.active,
        total_arrows: 0,
        quit_requested: false,
    };
    let mut fps = FpsCounter::new();
    log::info!("Display loop running in mode {}", app.active.label());

    while state == LoopState::Running {
        if app.drain(&rx) == Control::Quit {
            summary.quit_requested = true;
            state = LoopState::Stopped;
            continue;
        }

        let Some(frame) = pending.take().or_else(|| source.next_frame()) else {
            log::info!("Frame source exhausted");
            state = LoopState::Stopped;
            continue;
        };

        let gray = frame.to_gray();
        let rendered = render(&frame, &gray, &mut prev_gray, app.active, &config.flow);
        summary.total_arrows += rendered.arrows as u64;

        let mut output = rendered.output.into_color();
        app.buttons = draw_overlay(&mut output, app.active);
        presenter.present(&output)?;
        presenter.poll_input(&tx);

        summary.ticks += 1;
        log::trace!("tick {} in {}", summary.ticks, app.active.label());
        fps.tick();
    }

    summary.final_mode = app.active;
    log::info!("Display loop stopped after {} frames", summary.ticks);
    Ok(summary)
}
