// Dense optical flow (Farnebäck polynomial expansion) and the arrow field
// drawn on top of the live frame.
//
// Per pyramid level, coarsest first:
//   1. blur + downscale both gray frames,
//   2. fit a quadratic polynomial around every pixel (poly expansion),
//   3. accumulate the per-pixel normal equations using the current flow guess,
//   4. box-filter them over a window and solve the 2x2 system for the flow.
// The result of one level seeds the next (upscaled, vectors doubled).

use crate::draw::{Band, Segment};
use crate::types::{FrameBuffer, GrayFrame, pack_rgb};
use crate::vision::{blur_plane, gaussian_kernel};
use rayon::prelude::*;
use std::f32::consts::PI;

/// Levels smaller than this (in either dimension) are skipped.
const MIN_LEVEL_SIZE: f64 = 32.0;

/// Attenuation of the normal equations near the image border.
const BORDER: [f32; 5] = [0.14, 0.14, 0.4472, 0.4472, 0.4472];

#[derive(Clone, Debug, PartialEq)]
pub struct FlowParams {
    pub pyr_scale: f64,
    pub levels: usize,
    pub win_size: usize,
    pub iterations: usize,
    pub poly_n: usize,
    pub poly_sigma: f64,
}

impl Default for FlowParams {
    fn default() -> Self {
        Self {
            pyr_scale: 0.5,
            levels: 3,
            win_size: 15,
            iterations: 3,
            poly_n: 5,
            poly_sigma: 1.2,
        }
    }
}

/// Everything the optical-flow view needs besides the frames.
#[derive(Clone, Debug, PartialEq)]
pub struct FlowOptions {
    pub params: FlowParams,
    /// Displacements shorter than this (pixels) get no arrow.
    pub min_motion: f32,
    /// Arrow grid spacing in pixels.
    pub stride: usize,
}

impl Default for FlowOptions {
    fn default() -> Self {
        Self { params: FlowParams::default(), min_motion: 1.5, stride: 15 }
    }
}

/// Per-pixel displacement `(dx, dy)`, row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct FlowField {
    pub width: usize,
    pub height: usize,
    pub vectors: Vec<[f32; 2]>,
}

impl FlowField {
    pub fn zeros(width: usize, height: usize) -> Self {
        Self { width, height, vectors: vec![[0.0; 2]; width * height] }
    }

    /// Displacement at pixel (x, y).
    #[inline]
    pub fn at(&self, x: usize, y: usize) -> [f32; 2] {
        self.vectors[y * self.width + x]
    }
}

/* ------------------------------ polynomial expansion ------------------------------ */

/// Gaussian applicability tables for a (2n+1)² neighbourhood, plus the
/// entries of the inverted moment matrix the expansion needs.
struct Applicability {
    g: Vec<f32>,
    xg: Vec<f32>,
    xxg: Vec<f32>,
    ig11: f64,
    ig03: f64,
    ig33: f64,
    ig55: f64,
}

impl Applicability {
    fn new(n: usize, sigma: f64) -> Self {
        let sigma = if sigma < f64::from(f32::EPSILON) { n as f64 * 0.3 } else { sigma };
        let n = n as i64;
        let raw: Vec<f64> = (-n..=n)
            .map(|x| (-((x * x) as f64) / (2.0 * sigma * sigma)).exp())
            .collect();
        let sum: f64 = raw.iter().sum();
        let g: Vec<f32> = raw.iter().map(|v| (v / sum) as f32).collect();
        let xg: Vec<f32> = (-n..=n).zip(&g).map(|(x, &v)| x as f32 * v).collect();
        let xxg: Vec<f32> = (-n..=n).zip(&g).map(|(x, &v)| (x * x) as f32 * v).collect();

        // Moments of the separable 2-D weight g(x)g(y).
        let (mut s0, mut s2, mut s4, mut s22) = (0f64, 0f64, 0f64, 0f64);
        for (yi, y) in (-n..=n).enumerate() {
            for (xi, x) in (-n..=n).enumerate() {
                let w = g[yi] as f64 * g[xi] as f64;
                let (x2, y2) = ((x * x) as f64, (y * y) as f64);
                s0 += w;
                s2 += w * x2;
                s4 += w * x2 * x2;
                s22 += w * x2 * y2;
            }
        }
        // Only the {1, x², y²} block is coupled; invert it in closed form.
        let q = s0 * (s4 + s22) - 2.0 * s2 * s2;
        Self {
            g,
            xg,
            xxg,
            ig11: 1.0 / s2,
            ig03: -s2 / q,
            ig33: (s0 * s4 - s2 * s2) / ((s4 - s22) * q),
            ig55: 1.0 / s22,
        }
    }
}

/// Per pixel: `[b_y, b_x, a_yy, a_xx, a_xy]`.
fn poly_expand(src: &[f32], w: usize, h: usize, app: &Applicability) -> Vec<[f32; 5]> {
    let n = (app.g.len() / 2) as i64;
    let mut out = vec![[0f32; 5]; w * h];
    // vertical moments: Σg·I, Σ(k·g)·I, Σ(k²·g)·I
    let mut row = vec![[0f32; 3]; w];

    for y in 0..h {
        for (x, r) in row.iter_mut().enumerate() {
            let mut acc = [0f32; 3];
            for k in -n..=n {
                let sy = (y as i64 + k).clamp(0, h as i64 - 1) as usize;
                let v = src[sy * w + x];
                let ki = (k + n) as usize;
                acc[0] += app.g[ki] * v;
                acc[1] += app.xg[ki] * v;
                acc[2] += app.xxg[ki] * v;
            }
            *r = acc;
        }

        for x in 0..w {
            let mut b = [0f64; 6];
            for k in -n..=n {
                let sx = (x as i64 + k).clamp(0, w as i64 - 1) as usize;
                let ki = (k + n) as usize;
                let (g, xg, xxg) = (app.g[ki] as f64, app.xg[ki] as f64, app.xxg[ki] as f64);
                let [r0, r1, r2] = row[sx].map(f64::from);
                b[0] += g * r0; // 1
                b[1] += xg * r0; // x
                b[2] += g * r1; // y
                b[3] += xxg * r0; // x²
                b[4] += g * r2; // y²
                b[5] += xg * r1; // xy
            }
            out[y * w + x] = [
                (b[2] * app.ig11) as f32,
                (b[1] * app.ig11) as f32,
                (b[0] * app.ig03 + b[4] * app.ig33) as f32,
                (b[0] * app.ig03 + b[3] * app.ig33) as f32,
                (b[5] * app.ig55) as f32,
            ];
        }
    }
    out
}

/* ------------------------------ displacement estimation ------------------------------ */

/// Bilinear sample of a 5-channel plane, edges clamped.
fn sample5(r: &[[f32; 5]], w: usize, h: usize, fx: f32, fy: f32) -> [f32; 5] {
    let x0 = fx.floor();
    let y0 = fy.floor();
    let (ax, ay) = (fx - x0, fy - y0);
    let cx = |x: f32| (x as i64).clamp(0, w as i64 - 1) as usize;
    let cy = |y: f32| (y as i64).clamp(0, h as i64 - 1) as usize;
    let (xa, xb, ya, yb) = (cx(x0), cx(x0 + 1.0), cy(y0), cy(y0 + 1.0));
    let (p00, p01, p10, p11) = (&r[ya * w + xa], &r[ya * w + xb], &r[yb * w + xa], &r[yb * w + xb]);
    let (a00, a01, a10, a11) = ((1.0 - ax) * (1.0 - ay), ax * (1.0 - ay), (1.0 - ax) * ay, ax * ay);
    std::array::from_fn(|c| a00 * p00[c] + a01 * p01[c] + a10 * p10[c] + a11 * p11[c])
}

/// Per pixel: `[G_yy, G_xy, G_xx, h_y, h_x]` of the system `G d = h`.
fn update_matrices(r0: &[[f32; 5]], r1: &[[f32; 5]], flow: &FlowField) -> Vec<[f32; 5]> {
    let (w, h) = (flow.width, flow.height);
    let mut m = vec![[0f32; 5]; w * h];
    for y in 0..h {
        for x in 0..w {
            let i = y * w + x;
            let [dx, dy] = flow.vectors[i];
            let p = sample5(r1, w, h, x as f32 + dx, y as f32 + dy);
            let q = &r0[i];

            let mut r4 = (q[2] + p[2]) * 0.5;
            let mut r5 = (q[3] + p[3]) * 0.5;
            let mut r6 = (q[4] + p[4]) * 0.25;
            let mut r2 = (q[0] - p[0]) * 0.5 + r4 * dy + r6 * dx;
            let mut r3 = (q[1] - p[1]) * 0.5 + r6 * dy + r5 * dx;

            let near = |v: usize, n: usize| v < BORDER.len() || v + BORDER.len() >= n;
            if near(x, w) || near(y, h) {
                let edge = |v: usize, n: usize| {
                    let lo = if v < BORDER.len() { BORDER[v] } else { 1.0 };
                    let hi = if v + BORDER.len() >= n { BORDER[n - v - 1] } else { 1.0 };
                    lo * hi
                };
                let s = edge(x, w) * edge(y, h);
                r2 *= s;
                r3 *= s;
                r4 *= s;
                r5 *= s;
                r6 *= s;
            }

            m[i] = [
                r4 * r4 + r6 * r6,
                (r4 + r5) * r6,
                r5 * r5 + r6 * r6,
                r4 * r2 + r6 * r3,
                r6 * r2 + r5 * r3,
            ];
        }
    }
    m
}

/// Mean over a `win`×`win` window (edges replicated), running sums in f64.
fn box_filter5(m: &[[f32; 5]], w: usize, h: usize, win: usize) -> Vec<[f64; 5]> {
    let r = (win / 2) as i64;
    let clamp = |v: i64, n: usize| v.clamp(0, n as i64 - 1) as usize;

    let mut tmp = vec![[0f64; 5]; w * h];
    for y in 0..h {
        let mut acc = [0f64; 5];
        for k in -r..=r {
            let s = &m[y * w + clamp(k, w)];
            for c in 0..5 {
                acc[c] += s[c] as f64;
            }
        }
        for x in 0..w {
            tmp[y * w + x] = acc;
            let add = &m[y * w + clamp(x as i64 + r + 1, w)];
            let sub = &m[y * w + clamp(x as i64 - r, w)];
            for c in 0..5 {
                acc[c] += add[c] as f64 - sub[c] as f64;
            }
        }
    }

    let scale = 1.0 / (win * win) as f64;
    let mut out = vec![[0f64; 5]; w * h];
    for x in 0..w {
        let mut acc = [0f64; 5];
        for k in -r..=r {
            let s = &tmp[clamp(k, h) * w + x];
            for c in 0..5 {
                acc[c] += s[c];
            }
        }
        for y in 0..h {
            out[y * w + x] = acc.map(|v| v * scale);
            let add = &tmp[clamp(y as i64 + r + 1, h) * w + x];
            let sub = &tmp[clamp(y as i64 - r, h) * w + x];
            for c in 0..5 {
                acc[c] += add[c] - sub[c];
            }
        }
    }
    out
}

fn solve_flow(m: &[[f32; 5]], flow: &mut FlowField, win: usize) {
    let blurred = box_filter5(m, flow.width, flow.height, win);
    for (v, [g11, g12, g22, h1, h2]) in flow.vectors.iter_mut().zip(blurred) {
        let idet = 1.0 / (g11 * g22 - g12 * g12 + 1e-3);
        *v = [
            ((g11 * h2 - g12 * h1) * idet) as f32,
            ((g22 * h1 - g12 * h2) * idet) as f32,
        ];
    }
}

/* ------------------------------ pyramid ------------------------------ */

/// Bilinear resize with pixel-center alignment; `c` interleaved channels.
fn resize_bilinear(src: &[f32], sw: usize, sh: usize, c: usize, dw: usize, dh: usize) -> Vec<f32> {
    let mut out = vec![0f32; dw * dh * c];
    let (kx, ky) = (sw as f32 / dw as f32, sh as f32 / dh as f32);
    for y in 0..dh {
        let fy = ((y as f32 + 0.5) * ky - 0.5).clamp(0.0, (sh - 1) as f32);
        let y0 = fy as usize;
        let y1 = (y0 + 1).min(sh - 1);
        let ay = fy - y0 as f32;
        for x in 0..dw {
            let fx = ((x as f32 + 0.5) * kx - 0.5).clamp(0.0, (sw - 1) as f32);
            let x0 = fx as usize;
            let x1 = (x0 + 1).min(sw - 1);
            let ax = fx - x0 as f32;
            for ch in 0..c {
                let p = |xx: usize, yy: usize| src[(yy * sw + xx) * c + ch];
                let top = p(x0, y0) * (1.0 - ax) + p(x1, y0) * ax;
                let bottom = p(x0, y1) * (1.0 - ax) + p(x1, y1) * ax;
                out[(y * dw + x) * c + ch] = top * (1.0 - ay) + bottom * ay;
            }
        }
    }
    out
}

fn upscale_flow(prev: &FlowField, w: usize, h: usize, factor: f32) -> FlowField {
    let flat: Vec<f32> = prev.vectors.iter().flatten().copied().collect();
    let resized = resize_bilinear(&flat, prev.width, prev.height, 2, w, h);
    let vectors = resized.chunks_exact(2).map(|v| [v[0] * factor, v[1] * factor]).collect();
    FlowField { width: w, height: h, vectors }
}

/// Dense flow from `prev` to `next`. Frames of different sizes yield a zero
/// field the size of `next`.
pub fn farneback(prev: &GrayFrame, next: &GrayFrame, params: &FlowParams) -> FlowField {
    let (w, h) = (next.width() as usize, next.height() as usize);
    if prev.dimensions() != next.dimensions() || w == 0 || h == 0 {
        return FlowField::zeros(w, h);
    }
    let src = [prev, next].map(|g| g.as_raw().iter().map(|&v| v as f32).collect::<Vec<f32>>());
    let app = Applicability::new(params.poly_n, params.poly_sigma);

    let mut levels = 0;
    let mut scale = 1.0;
    for k in 0..params.levels {
        scale *= params.pyr_scale;
        if w as f64 * scale < MIN_LEVEL_SIZE || h as f64 * scale < MIN_LEVEL_SIZE {
            break;
        }
        levels = k + 1;
    }

    let mut flow: Option<FlowField> = None;
    for k in (0..=levels).rev() {
        let scale = params.pyr_scale.powi(k as i32);
        let lw = ((w as f64 * scale).round() as usize).max(1);
        let lh = ((h as f64 * scale).round() as usize).max(1);

        // Pre-smoothing before decimation; level 0 still gets a light 3x3 pass.
        let mut sigma = (1.0 / scale - 1.0) * 0.5;
        let ksize = (((sigma * 5.0).round() as usize) | 1).max(3);
        if sigma <= 0.0 {
            sigma = 0.3 * ((ksize as f64 - 1.0) * 0.5 - 1.0) + 0.8;
        }
        let kernel = gaussian_kernel(ksize, sigma);

        let r: Vec<Vec<[f32; 5]>> = src
            .iter()
            .map(|img| {
                let smoothed = blur_plane(img, w, h, &kernel);
                let level = if (lw, lh) == (w, h) {
                    smoothed
                } else {
                    resize_bilinear(&smoothed, w, h, 1, lw, lh)
                };
                poly_expand(&level, lw, lh, &app)
            })
            .collect();

        let mut current = match flow.take() {
            Some(prev) => upscale_flow(&prev, lw, lh, (1.0 / params.pyr_scale) as f32),
            None => FlowField::zeros(lw, lh),
        };

        let mut m = update_matrices(&r[0], &r[1], &current);
        for i in 0..params.iterations {
            solve_flow(&m, &mut current, params.win_size);
            if i + 1 < params.iterations {
                m = update_matrices(&r[0], &r[1], &current);
            }
        }
        flow = Some(current);
    }
    flow.unwrap_or_else(|| FlowField::zeros(w, h))
}

/* ------------------------------ arrows ------------------------------ */

/// Angle (degrees) to an RGB cycle: wrap into [0, 360), `t = a / 360`,
/// R = |sin(tπ)|, G = |sin(2tπ)|, B = |cos(tπ)|, each scaled to 255.
pub fn angle_to_color(angle_deg: f32) -> u32 {
    let t = angle_deg.rem_euclid(360.0) / 360.0;
    let r = (255.0 * (t * PI).sin().abs()) as u8;
    let g = (255.0 * (t * 2.0 * PI).sin().abs()) as u8;
    let b = (255.0 * (t * PI).cos().abs()) as u8;
    pack_rgb(r, g, b)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Arrow {
    pub from: (i32, i32),
    pub to: (i32, i32),
    pub color: u32,
}

impl Arrow {
    /// Shaft plus two tip strokes at ±45°, each 0.3 of the shaft length.
    pub fn segments(&self) -> [Segment; 3] {
        let (x0, y0) = (self.from.0 as f64, self.from.1 as f64);
        let (x1, y1) = (self.to.0 as f64, self.to.1 as f64);
        let tip = ((x1 - x0).powi(2) + (y1 - y0).powi(2)).sqrt() * 0.3;
        let back = (y0 - y1).atan2(x0 - x1);
        let barb = |a: f64| {
            let p = ((x1 + tip * a.cos()).round() as i32, (y1 + tip * a.sin()).round() as i32);
            Segment::new(p, self.to, self.color)
        };
        [
            Segment::new(self.from, self.to, self.color),
            barb(back + std::f64::consts::FRAC_PI_4),
            barb(back - std::f64::consts::FRAC_PI_4),
        ]
    }
}

/// One arrow per grid cell whose displacement is nonzero and at least `min_motion`.
pub fn flow_arrows(flow: &FlowField, stride: usize, min_motion: f32) -> Vec<Arrow> {
    let stride = stride.max(1);
    let mut arrows = Vec::new();
    for y in (0..flow.height).step_by(stride) {
        for x in (0..flow.width).step_by(stride) {
            let [fx, fy] = flow.at(x, y);
            let mag = (fx * fx + fy * fy).sqrt();
            // a still cell never gets an arrow, whatever the threshold
            if mag == 0.0 || mag < min_motion {
                continue;
            }
            let angle = fy.atan2(fx).to_degrees();
            arrows.push(Arrow {
                from: (x as i32, y as i32),
                to: ((x as f32 + fx).round() as i32, (y as f32 + fy).round() as i32),
                color: angle_to_color(angle),
            });
        }
    }
    arrows
}

/// Rasterize arrows in parallel over horizontal bands of the frame.
/// Each band owns its rows exclusively and draws only the clipped part of
/// every segment crossing it, so the result matches a sequential draw.
pub fn draw_arrows(fb: &mut FrameBuffer, arrows: &[Arrow]) {
    if arrows.is_empty() || fb.width == 0 || fb.height == 0 {
        return;
    }
    let segments: Vec<Segment> = arrows.iter().flat_map(|a| a.segments()).collect();
    let width = fb.width;
    let band_rows = fb.height.div_ceil(rayon::current_num_threads().max(1)).max(1);

    fb.pixels
        .par_chunks_mut(band_rows * width)
        .enumerate()
        .for_each(|(i, rows)| {
            let mut band = Band::new(rows, width, i * band_rows);
            for seg in &segments {
                if band.intersects_rows(seg.min_y(), seg.max_y()) {
                    band.draw_segment(seg);
                }
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::plaid;

    #[test]
    fn identical_frames_have_zero_flow() {
        let g = plaid(96, 80, 0.0);
        let flow = farneback(&g, &g, &FlowParams::default());
        assert_eq!((flow.width, flow.height), (96, 80));
        assert!(flow.vectors.iter().all(|v| v[0] == 0.0 && v[1] == 0.0));
    }

    #[test]
    fn horizontal_shift_is_recovered_in_the_middle() {
        let a = plaid(128, 128, 0.0);
        let b = plaid(128, 128, 3.0);
        let flow = farneback(&a, &b, &FlowParams::default());
        let [dx, dy] = flow.at(64, 64);
        assert!(dx > 1.5 && dx < 5.0, "dx = {dx}");
        assert!(dy.abs() < 1.0, "dy = {dy}");
    }

    #[test]
    fn mismatched_sizes_give_empty_motion() {
        let flow = farneback(&plaid(40, 40, 0.0), &plaid(48, 40, 0.0), &FlowParams::default());
        assert_eq!(flow, FlowField::zeros(48, 40));
    }

    #[test]
    fn angle_color_is_periodic() {
        for a in [-270.0f32, -90.0, 0.0, 45.0, 123.5, 180.0, 300.0] {
            assert_eq!(angle_to_color(a), angle_to_color(a + 360.0), "angle {a}");
        }
        assert_eq!(angle_to_color(0.0), angle_to_color(360.0));
        assert_eq!(angle_to_color(720.0), angle_to_color(0.0));
    }

    #[test]
    fn angle_color_cycle_landmarks() {
        // 0°: only blue; 90°: t = 0.25
        assert_eq!(angle_to_color(0.0), pack_rgb(0, 0, 255));
        assert_eq!(angle_to_color(180.0), pack_rgb(255, 0, 0));
        assert_eq!(angle_to_color(90.0), pack_rgb(180, 255, 180));
    }

    #[test]
    fn arrows_respect_threshold_and_grid() {
        let mut flow = FlowField::zeros(40, 40);
        flow.vectors[15 * 40 + 15] = [3.0, 0.0];
        flow.vectors[15 * 40 + 30] = [1.0, 0.0];
        flow.vectors[16 * 40 + 16] = [9.0, 9.0]; // off-grid
        let arrows = flow_arrows(&flow, 15, 1.5);
        assert_eq!(arrows.len(), 1);
        assert_eq!(arrows[0].from, (15, 15));
        assert_eq!(arrows[0].to, (18, 15));
        assert!(flow_arrows(&flow, 15, 5.0).is_empty());
    }

    #[test]
    fn zero_threshold_still_skips_still_cells() {
        let mut flow = FlowField::zeros(40, 40);
        assert!(flow_arrows(&flow, 15, 0.0).is_empty());
        assert!(flow_arrows(&flow, 15, -3.0).is_empty());
        assert!(flow_arrows(&flow, 15, f32::NAN).is_empty());

        flow.vectors[15 * 40 + 15] = [0.2, 0.0];
        assert_eq!(flow_arrows(&flow, 15, 0.0).len(), 1);
    }

    #[test]
    fn banded_draw_matches_sequential_draw() {
        let arrows = vec![
            Arrow { from: (2, 2), to: (30, 45), color: 0xFF0000 },
            Arrow { from: (40, 5), to: (3, 60), color: 0x00FF00 },
            Arrow { from: (10, 63), to: (10, 0), color: 0x0000FF },
        ];
        let mut parallel = FrameBuffer::filled(48, 64, 0);
        draw_arrows(&mut parallel, &arrows);

        let mut sequential = FrameBuffer::filled(48, 64, 0);
        let mut whole = Band::whole(&mut sequential);
        for seg in arrows.iter().flat_map(|a| a.segments()) {
            whole.draw_segment(&seg);
        }
        assert_eq!(parallel, sequential);
        assert!(parallel.pixels.iter().any(|&p| p == 0xFF0000));
    }
}
