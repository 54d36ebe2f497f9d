// Mode dispatch: one frame in, one annotated frame out.
// Only the optical-flow view carries state across ticks, and it does so
// through the explicit `prev_gray` in/out parameter.

use crate::flow::{FlowOptions, draw_arrows, farneback, flow_arrows};
use crate::modes::Mode;
use crate::types::{FrameBuffer, GrayFrame};
use crate::vision;

const BLUR_KSIZE: usize = 21;
const BLUR_SIGMA: f64 = 5.0;
const CANNY_LOW: i32 = 50;
const CANNY_HIGH: i32 = 150;
const THRESHOLD_LEVEL: u8 = 100;

/// A transform yields either a color or a single-channel image.
#[derive(Clone, Debug, PartialEq)]
pub enum Output {
    Color(FrameBuffer),
    Gray(GrayFrame),
}

impl Output {
    /// Visual: gray results are shown as neutral gray so buttons can be painted in color.
    pub fn into_color(self) -> FrameBuffer {
        match self {
            Output::Color(fb) => fb,
            Output::Gray(g) => FrameBuffer::from_gray(&g),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Rendered {
    pub output: Output,
    /// Arrows drawn this frame (always 0 outside optical flow).
    pub arrows: usize,
}

impl Rendered {
    fn plain(output: Output) -> Self {
        Self { output, arrows: 0 }
    }
}

/// Run `mode` on one frame. Visual: the picture the window shows before the
/// buttons are painted on top.
pub fn render(
    frame: &FrameBuffer,
    gray: &GrayFrame,
    prev_gray: &mut GrayFrame,
    mode: Mode,
    flow: &FlowOptions,
) -> Rendered {
    match mode {
        Mode::Grayscale => Rendered::plain(Output::Gray(gray.clone())),
        Mode::SobelX => Rendered::plain(Output::Gray(vision::sobel_x(gray))),
        Mode::SobelY => Rendered::plain(Output::Gray(vision::sobel_y(gray))),
        Mode::Blur => Rendered::plain(Output::Gray(vision::gaussian_blur(gray, BLUR_KSIZE, BLUR_SIGMA))),
        Mode::OpticalFlow => optical_flow(frame, gray, prev_gray, flow),
        Mode::Edges => Rendered::plain(Output::Gray(vision::canny(gray, CANNY_LOW, CANNY_HIGH))),
        Mode::Laplacian => Rendered::plain(Output::Gray(vision::laplacian(gray))),
        Mode::Threshold => Rendered::plain(Output::Gray(vision::threshold(gray, THRESHOLD_LEVEL))),
        Mode::GradientMagnitude => Rendered::plain(Output::Gray(vision::gradient_magnitude(gray))),
        Mode::ColorMask => Rendered::plain(Output::Gray(vision::hsv_in_range(
            frame,
            vision::BLUE_LOWER,
            vision::BLUE_UPPER,
        ))),
        Mode::Passthrough => Rendered::plain(Output::Color(frame.clone())),
    }
}

fn optical_flow(
    frame: &FrameBuffer,
    gray: &GrayFrame,
    prev_gray: &mut GrayFrame,
    opts: &FlowOptions,
) -> Rendered {
    let field = farneback(prev_gray, gray, &opts.params);
    let arrows = flow_arrows(&field, opts.stride, opts.min_motion);
    log::debug!("optical flow: {} arrows", arrows.len());

    let mut out = frame.clone();
    draw_arrows(&mut out, &arrows);
    *prev_gray = gray.clone();
    Rendered { output: Output::Color(out), arrows: arrows.len() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{plaid, plaid_frame};

    fn inputs() -> (FrameBuffer, GrayFrame) {
        let frame = plaid_frame(64, 48, 0.0);
        let gray = frame.to_gray();
        (frame, gray)
    }

    #[test]
    fn every_mode_is_deterministic() {
        let (frame, gray) = inputs();
        let opts = FlowOptions::default();
        for mode in Mode::ALL.into_iter().chain([Mode::Passthrough]) {
            let mut prev_a = gray.clone();
            let mut prev_b = gray.clone();
            let a = render(&frame, &gray, &mut prev_a, mode, &opts);
            let b = render(&frame, &gray, &mut prev_b, mode, &opts);
            assert_eq!(a, b, "{mode:?}");
        }
    }

    #[test]
    fn only_optical_flow_touches_prev_gray() {
        let (frame, gray) = inputs();
        let stale = plaid(64, 48, 7.0);
        let opts = FlowOptions::default();
        for mode in Mode::ALL.into_iter().filter(|m| *m != Mode::OpticalFlow) {
            let mut prev = stale.clone();
            render(&frame, &gray, &mut prev, mode, &opts);
            assert_eq!(prev, stale, "{mode:?}");
        }
        let mut prev = stale.clone();
        render(&frame, &gray, &mut prev, Mode::OpticalFlow, &opts);
        assert_eq!(prev, gray);
    }

    #[test]
    fn unknown_ids_pass_the_frame_through() {
        let (frame, gray) = inputs();
        for id in [-1, 10, 42] {
            let mut prev = gray.clone();
            let out = render(&frame, &gray, &mut prev, Mode::from_id(id), &FlowOptions::default());
            assert_eq!(out.output, Output::Color(frame.clone()));
        }
    }

    #[test]
    fn grayscale_mode_returns_luminance() {
        let (frame, gray) = inputs();
        let mut prev = gray.clone();
        let out = render(&frame, &gray, &mut prev, Mode::Grayscale, &FlowOptions::default());
        assert_eq!(out.output, Output::Gray(gray.clone()));
        assert_eq!(out.output.into_color(), FrameBuffer::from_gray(&gray));
    }

    #[test]
    fn no_motion_draws_no_arrows_at_any_threshold() {
        let (frame, gray) = inputs();
        for min_motion in [0.0, 0.0001, 1.5] {
            let mut prev = gray.clone();
            let opts = FlowOptions { min_motion, ..FlowOptions::default() };
            let out = render(&frame, &gray, &mut prev, Mode::OpticalFlow, &opts);
            assert_eq!(out.arrows, 0, "min_motion {min_motion}");
            assert_eq!(out.output, Output::Color(frame.clone()));
        }
    }

    #[test]
    fn shifted_texture_draws_arrows_above_threshold_only() {
        let frame = plaid_frame(128, 128, 3.0);
        let gray = frame.to_gray();
        let before = plaid_frame(128, 128, 0.0).to_gray();

        let mut prev = before.clone();
        let moving = render(&frame, &gray, &mut prev, Mode::OpticalFlow, &FlowOptions::default());
        assert!(moving.arrows > 0);
        assert_ne!(moving.output, Output::Color(frame.clone()));

        let mut prev = before;
        let strict = FlowOptions { min_motion: 50.0, ..FlowOptions::default() };
        let still = render(&frame, &gray, &mut prev, Mode::OpticalFlow, &strict);
        assert_eq!(still.arrows, 0);
    }

    #[test]
    fn color_mask_sees_the_blue_half() {
        let (frame, gray) = inputs();
        let mut prev = gray.clone();
        let out = render(&frame, &gray, &mut prev, Mode::ColorMask, &FlowOptions::default());
        let Output::Gray(mask) = out.output else { panic!("mask should be gray") };
        assert!(mask.get_pixel(5, 5)[0] == 255 || mask.get_pixel(10, 20)[0] == 255);
        assert!((32..64).all(|x| mask.get_pixel(x, 10)[0] == 0));
    }
}
