// Synthetic frames shared by the unit tests.

use crate::types::{FrameBuffer, GrayFrame, pack_rgb};
use image::{GrayImage, Luma};
use std::f32::consts::PI;

/// Smooth plaid texture (32 px period), shifted right by `dx` pixels.
pub fn plaid(w: u32, h: u32, dx: f32) -> GrayFrame {
    GrayImage::from_fn(w, h, |x, y| {
        let fx = (x as f32 - dx) * 2.0 * PI / 32.0;
        let fy = y as f32 * 2.0 * PI / 32.0;
        Luma([(128.0 + 50.0 * fx.sin() + 50.0 * fy.sin()).round() as u8])
    })
}

/// The plaid as a color frame with a bluish tint in the left half.
pub fn plaid_frame(w: u32, h: u32, dx: f32) -> FrameBuffer {
    let gray = plaid(w, h, dx);
    let mut fb = FrameBuffer::from_gray(&gray);
    let w = w as usize;
    for (i, px) in fb.pixels.iter_mut().enumerate() {
        if i % w < w / 2 {
            let v = (*px & 0xFF) as u8;
            *px = pack_rgb(v / 4, v / 4, v / 4 + 160);
        }
    }
    fb
}

impl FrameBuffer {
    pub fn filled(width: usize, height: usize, color: u32) -> Self {
        Self { width, height, pixels: vec![color; width * height] }
    }
}
