// Per-frame image transforms on grayscale planes (plus the HSV color mask).
// Every convolution here reads past the border with reflect-101
// (…, 2, 1 | 0, 1, 2, … , n-2, n-1 | n-2, …), so flat images stay flat.

use crate::types::{FrameBuffer, GrayFrame, unpack_rgb};
use image::GrayImage;

const SOBEL_X: [[i32; 3]; 3] = [[-1, 0, 1], [-2, 0, 2], [-1, 0, 1]];
const SOBEL_Y: [[i32; 3]; 3] = [[-1, -2, -1], [0, 0, 0], [1, 2, 1]];
const LAPLACE: [[i32; 3]; 3] = [[0, 1, 0], [1, -4, 1], [0, 1, 0]];

/// Hue/saturation/value window picked out by the color mask (OpenCV-style
/// 8-bit HSV: hue in 0..180).
pub const BLUE_LOWER: [u8; 3] = [100, 100, 100];
pub const BLUE_UPPER: [u8; 3] = [130, 255, 255];

#[inline]
pub(crate) fn reflect101(i: i64, n: usize) -> usize {
    let n = n as i64;
    if n == 1 {
        return 0;
    }
    let mut i = i;
    while i < 0 || i >= n {
        i = if i < 0 { -i } else { 2 * n - 2 - i };
    }
    i as usize
}

fn convolve3x3(gray: &GrayFrame, k: &[[i32; 3]; 3]) -> Vec<i32> {
    let (w, h) = (gray.width() as usize, gray.height() as usize);
    let src = gray.as_raw();
    let mut out = vec![0i32; w * h];
    for y in 0..h {
        let rows = [
            reflect101(y as i64 - 1, h) * w,
            y * w,
            reflect101(y as i64 + 1, h) * w,
        ];
        for x in 0..w {
            let cols = [reflect101(x as i64 - 1, w), x, reflect101(x as i64 + 1, w)];
            let mut acc = 0;
            for (ky, row) in rows.iter().enumerate() {
                for (kx, col) in cols.iter().enumerate() {
                    acc += k[ky][kx] * src[row + col] as i32;
                }
            }
            out[y * w + x] = acc;
        }
    }
    out
}

/// `|v|` saturated to 0..255, the usual way of viewing a signed response.
fn scale_abs(values: &[i32], w: u32, h: u32) -> GrayFrame {
    let mut out = GrayImage::new(w, h);
    for (dst, &v) in out.iter_mut().zip(values) {
        *dst = v.unsigned_abs().min(255) as u8;
    }
    out
}

/// Horizontal gradient. Visual: vertical edges light up.
pub fn sobel_x(gray: &GrayFrame) -> GrayFrame {
    scale_abs(&convolve3x3(gray, &SOBEL_X), gray.width(), gray.height())
}

/// Vertical gradient. Visual: horizontal edges light up.
pub fn sobel_y(gray: &GrayFrame) -> GrayFrame {
    scale_abs(&convolve3x3(gray, &SOBEL_Y), gray.width(), gray.height())
}

/// 4-neighbour Laplacian. Visual: fine texture and thin lines glow, flat areas go black.
pub fn laplacian(gray: &GrayFrame) -> GrayFrame {
    scale_abs(&convolve3x3(gray, &LAPLACE), gray.width(), gray.height())
}

/// Normalized 1-D Gaussian taps, centered on `ksize / 2`.
pub fn gaussian_kernel(ksize: usize, sigma: f64) -> Vec<f32> {
    let half = (ksize / 2) as f64;
    let denom = 2.0 * sigma * sigma;
    let raw: Vec<f64> = (0..ksize)
        .map(|i| {
            let x = i as f64 - half;
            (-x * x / denom).exp()
        })
        .collect();
    let sum: f64 = raw.iter().sum();
    raw.iter().map(|w| (w / sum) as f32).collect()
}

/// Separable Gaussian on a float plane; shared with the flow pyramid.
pub(crate) fn blur_plane(src: &[f32], w: usize, h: usize, kernel: &[f32]) -> Vec<f32> {
    let r = (kernel.len() / 2) as i64;
    let mut tmp = vec![0f32; w * h];
    for y in 0..h {
        let row = &src[y * w..(y + 1) * w];
        for x in 0..w {
            let mut acc = 0f32;
            for (ki, &kw) in kernel.iter().enumerate() {
                acc += kw * row[reflect101(x as i64 + ki as i64 - r, w)];
            }
            tmp[y * w + x] = acc;
        }
    }
    let mut out = vec![0f32; w * h];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0f32;
            for (ki, &kw) in kernel.iter().enumerate() {
                acc += kw * tmp[reflect101(y as i64 + ki as i64 - r, h) * w + x];
            }
            out[y * w + x] = acc;
        }
    }
    out
}

/// Large-kernel Gaussian smoothing on the gray image.
pub fn gaussian_blur(gray: &GrayFrame, ksize: usize, sigma: f64) -> GrayFrame {
    let (w, h) = (gray.width() as usize, gray.height() as usize);
    let src: Vec<f32> = gray.as_raw().iter().map(|&v| v as f32).collect();
    let blurred = blur_plane(&src, w, h, &gaussian_kernel(ksize, sigma));
    let mut out = GrayImage::new(gray.width(), gray.height());
    for (dst, v) in out.iter_mut().zip(blurred) {
        *dst = v.round().clamp(0.0, 255.0) as u8;
    }
    out
}

/// Binary threshold: strictly above `level` becomes 255, everything else 0.
pub fn threshold(gray: &GrayFrame, level: u8) -> GrayFrame {
    let mut out = gray.clone();
    for v in out.iter_mut() {
        *v = if *v > level { 255 } else { 0 };
    }
    out
}

/// `sqrt(dx² + dy²)` stretched so the strongest edge in the frame is 255.
/// A frame with no gradient at all comes out black.
pub fn gradient_magnitude(gray: &GrayFrame) -> GrayFrame {
    let dx = convolve3x3(gray, &SOBEL_X);
    let dy = convolve3x3(gray, &SOBEL_Y);
    let mag: Vec<f32> = dx
        .iter()
        .zip(&dy)
        .map(|(&gx, &gy)| ((gx * gx + gy * gy) as f32).sqrt())
        .collect();

    let (lo, hi) = mag
        .iter()
        .fold((f32::MAX, f32::MIN), |(lo, hi), &m| (lo.min(m), hi.max(m)));
    let range = hi - lo;
    let scale = if range > f32::EPSILON { 255.0 / range } else { 0.0 };

    let mut out = GrayImage::new(gray.width(), gray.height());
    for (dst, m) in out.iter_mut().zip(mag) {
        *dst = ((m - lo) * scale).round().clamp(0.0, 255.0) as u8;
    }
    out
}

/// Two-threshold edge map: L1 gradient, non-maximum suppression along the
/// quantized gradient direction, then hysteresis linking (8-connected).
pub fn canny(gray: &GrayFrame, low: i32, high: i32) -> GrayFrame {
    let (w, h) = (gray.width() as usize, gray.height() as usize);
    let dx = convolve3x3(gray, &SOBEL_X);
    let dy = convolve3x3(gray, &SOBEL_Y);
    let mag: Vec<i32> = dx.iter().zip(&dy).map(|(a, b)| a.abs() + b.abs()).collect();
    let at = |x: i64, y: i64| -> i32 {
        if x < 0 || y < 0 || x >= w as i64 || y >= h as i64 {
            0
        } else {
            mag[y as usize * w + x as usize]
        }
    };

    // tan(22.5°) in Q15
    const TG22: i64 = 13573;

    const NONE: u8 = 0;
    const WEAK: u8 = 1;
    const STRONG: u8 = 2;
    let mut class = vec![NONE; w * h];
    let mut stack = Vec::new();

    for y in 0..h {
        for x in 0..w {
            let i = y * w + x;
            let m = mag[i];
            if m <= low {
                continue;
            }
            let (xs, ys) = (dx[i] as i64, dy[i] as i64);
            let ax = xs.abs();
            let ay = ys.abs() << 15;
            let tg22x = ax * TG22;
            let (xi, yi) = (x as i64, y as i64);

            let is_max = if ay < tg22x {
                m > at(xi - 1, yi) && m >= at(xi + 1, yi)
            } else {
                let tg67x = tg22x + (ax << 16);
                if ay > tg67x {
                    m > at(xi, yi - 1) && m >= at(xi, yi + 1)
                } else {
                    let s = if (xs ^ ys) < 0 { -1 } else { 1 };
                    m > at(xi - s, yi - 1) && m > at(xi + s, yi + 1)
                }
            };
            if !is_max {
                continue;
            }
            if m > high {
                class[i] = STRONG;
                stack.push(i);
            } else {
                class[i] = WEAK;
            }
        }
    }

    while let Some(i) = stack.pop() {
        let (x, y) = ((i % w) as i64, (i / w) as i64);
        for ny in y - 1..=y + 1 {
            for nx in x - 1..=x + 1 {
                if nx < 0 || ny < 0 || nx >= w as i64 || ny >= h as i64 {
                    continue;
                }
                let n = ny as usize * w + nx as usize;
                if class[n] == WEAK {
                    class[n] = STRONG;
                    stack.push(n);
                }
            }
        }
    }

    let mut out = GrayImage::new(gray.width(), gray.height());
    for (dst, c) in out.iter_mut().zip(class) {
        *dst = if c == STRONG { 255 } else { 0 };
    }
    out
}

/// RGB -> 8-bit HSV with hue halved into 0..180.
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> [u8; 3] {
    let (rf, gf, bf) = (r as f32, g as f32, b as f32);
    let v = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let diff = v - min;

    let s = if v > 0.0 { diff * 255.0 / v } else { 0.0 };
    let mut hue = if diff == 0.0 {
        0.0
    } else if v == rf {
        60.0 * (gf - bf) / diff
    } else if v == gf {
        120.0 + 60.0 * (bf - rf) / diff
    } else {
        240.0 + 60.0 * (rf - gf) / diff
    };
    if hue < 0.0 {
        hue += 360.0;
    }
    [
        (hue / 2.0).round().min(179.0) as u8,
        s.round() as u8,
        v as u8,
    ]
}

/// 255 where the pixel's HSV falls inside `[lower, upper]` on every channel.
/// Visual: with the blue bounds, blue objects turn white and the rest black.
pub fn hsv_in_range(frame: &FrameBuffer, lower: [u8; 3], upper: [u8; 3]) -> GrayFrame {
    let mut out = GrayImage::new(frame.width as u32, frame.height as u32);
    for (dst, &px) in out.iter_mut().zip(&frame.pixels) {
        let (r, g, b) = unpack_rgb(px);
        let hsv = rgb_to_hsv(r, g, b);
        let inside = (0..3).all(|c| hsv[c] >= lower[c] && hsv[c] <= upper[c]);
        *dst = if inside { 255 } else { 0 };
    }
    out
}
