// Software drawing onto 0x00RRGGBB buffers.
// Everything draws through a `Band`: a run of whole rows of a frame. The
// overlay uses one band covering the frame; the flow arrows split the frame
// into several bands and draw them from worker threads.

use crate::types::{FrameBuffer, Rect};

/// Mutable view of rows `y0 .. y0 + rows` of a frame `width` pixels wide.
pub struct Band<'a> {
    pixels: &'a mut [u32],
    width: usize,
    y0: i32,
    y1: i32,
}

impl<'a> Band<'a> {
    pub fn new(pixels: &'a mut [u32], width: usize, y0: usize) -> Self {
        let rows = if width == 0 { 0 } else { pixels.len() / width };
        Self { pixels, width, y0: y0 as i32, y1: (y0 + rows) as i32 }
    }

    /// The entire frame as one band.
    pub fn whole(fb: &'a mut FrameBuffer) -> Self {
        let width = fb.width;
        Self::new(&mut fb.pixels, width, 0)
    }

    /// Does `[min_y, max_y]` share at least one row with this band?
    pub fn intersects_rows(&self, min_y: i32, max_y: i32) -> bool {
        max_y >= self.y0 && min_y < self.y1
    }

    /// Put a pixel if (x,y) is inside the band; frame coordinates.
    #[inline]
    pub fn put_pixel(&mut self, x: i32, y: i32, color: u32) {
        if x < 0 || x as usize >= self.width || y < self.y0 || y >= self.y1 {
            return;
        }
        let idx = (y - self.y0) as usize * self.width + x as usize;
        self.pixels[idx] = color;
    }

    /// Thin line between (x0,y0) and (x1,y1) using Bresenham.
    pub fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: u32) {
        let (mut x0, mut y0) = (x0, y0);
        let dx = (x1 - x0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let dy = -(y1 - y0).abs();
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            self.put_pixel(x0, y0, color);
            if x0 == x1 && y0 == y1 { break; }
            let e2 = 2 * err;
            if e2 >= dy { err += dy; x0 += sx; }
            if e2 <= dx { err += dx; y0 += sy; }
        }
    }

    /// Visual: one stroke of a flow arrow, clipped to this band.
    pub fn draw_segment(&mut self, seg: &Segment) {
        self.draw_line(seg.from.0, seg.from.1, seg.to.0, seg.to.1, seg.color);
    }

    /// Solid rectangle, clipped to the band. Visual: a button background.
    pub fn fill_rect(&mut self, rect: Rect, color: u32) {
        let ys = rect.y.max(self.y0)..(rect.y + rect.h).min(self.y1);
        let xs = rect.x.max(0)..(rect.x + rect.w).min(self.width as i32);
        for y in ys {
            for x in xs.clone() {
                self.put_pixel(x, y, color);
            }
        }
    }

    /// Draw `text` with 5x7 glyphs blown up `scale` times, top-left at (x,y).
    /// Lowercase is drawn with the uppercase glyphs; unknown characters leave a gap.
    /// With `shadow`, each glyph gets a one-pixel (scaled) drop shadow first.
    pub fn draw_text(&mut self, x: i32, y: i32, text: &str, color: u32, scale: i32, shadow: Option<u32>) {
        let scale = scale.max(1);
        let mut cx = x;
        for ch in text.chars() {
            if let Some(rows) = glyph5x7(ch.to_ascii_uppercase()) {
                if let Some(sc) = shadow {
                    self.draw_glyph(cx + scale, y + scale, &rows, sc, scale);
                }
                self.draw_glyph(cx, y, &rows, color, scale);
            }
            cx += 6 * scale; // 5 pixels glyph width + 1 pixel spacing
        }
    }

    fn draw_glyph(&mut self, x: i32, y: i32, rows: &[u8; 7], color: u32, scale: i32) {
        for (ry, rowbits) in rows.iter().enumerate() {
            for rx in 0..5 {
                if (rowbits & (1 << (4 - rx))) != 0 {
                    let px = Rect::new(x + rx * scale, y + ry as i32 * scale, scale, scale);
                    self.fill_rect(px, color);
                }
            }
        }
    }
}

/// A colored line segment in frame coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Segment {
    pub from: (i32, i32),
    pub to: (i32, i32),
    pub color: u32,
}

impl Segment {
    pub fn new(from: (i32, i32), to: (i32, i32), color: u32) -> Self {
        Self { from, to, color }
    }

    /// Topmost row the segment touches.
    pub fn min_y(&self) -> i32 {
        self.from.1.min(self.to.1)
    }

    /// Bottommost row the segment touches.
    pub fn max_y(&self) -> i32 {
        self.from.1.max(self.to.1)
    }
}

/* ---------- 5x7 bitmap font ---------- */

/// Each u8 is a row; the low 5 bits are the pixels (bit 4 = leftmost).
fn glyph5x7(ch: char) -> Option<[u8; 7]> {
    macro_rules! g { ($a:expr,$b:expr,$c:expr,$d:expr,$e:expr,$f:expr,$g:expr) => {
        Some([$a,$b,$c,$d,$e,$f,$g])
    }; }

    match ch {
        '0' => g!(0b01110,0b10001,0b10011,0b10101,0b11001,0b10001,0b01110),
        '1' => g!(0b00100,0b01100,0b00100,0b00100,0b00100,0b00100,0b01110),
        '2' => g!(0b01110,0b10001,0b00001,0b00010,0b00100,0b01000,0b11111),
        '3' => g!(0b11110,0b00001,0b00001,0b01110,0b00001,0b00001,0b11110),
        '4' => g!(0b00010,0b00110,0b01010,0b10010,0b11111,0b00010,0b00010),
        '5' => g!(0b11111,0b10000,0b11110,0b00001,0b00001,0b10001,0b01110),
        '6' => g!(0b00110,0b01000,0b10000,0b11110,0b10001,0b10001,0b01110),
        '7' => g!(0b11111,0b00001,0b00010,0b00100,0b01000,0b01000,0b01000),
        '8' => g!(0b01110,0b10001,0b10001,0b01110,0b10001,0b10001,0b01110),
        '9' => g!(0b01110,0b10001,0b10001,0b01111,0b00001,0b00010,0b01100),

        'A' => g!(0b01110,0b10001,0b10001,0b11111,0b10001,0b10001,0b10001),
        'B' => g!(0b11110,0b10001,0b10001,0b11110,0b10001,0b10001,0b11110),
        'C' => g!(0b01110,0b10001,0b10000,0b10000,0b10000,0b10001,0b01110),
        'D' => g!(0b11100,0b10010,0b10001,0b10001,0b10001,0b10010,0b11100),
        'E' => g!(0b11111,0b10000,0b10000,0b11110,0b10000,0b10000,0b11111),
        'F' => g!(0b11111,0b10000,0b10000,0b11110,0b10000,0b10000,0b10000),
        'G' => g!(0b01110,0b10001,0b10000,0b10111,0b10001,0b10001,0b01111),
        'H' => g!(0b10001,0b10001,0b10001,0b11111,0b10001,0b10001,0b10001),
        'I' => g!(0b01110,0b00100,0b00100,0b00100,0b00100,0b00100,0b01110),
        'J' => g!(0b00111,0b00010,0b00010,0b00010,0b00010,0b10010,0b01100),
        'K' => g!(0b10001,0b10010,0b10100,0b11000,0b10100,0b10010,0b10001),
        'L' => g!(0b10000,0b10000,0b10000,0b10000,0b10000,0b10000,0b11111),
        'M' => g!(0b10001,0b11011,0b10101,0b10101,0b10001,0b10001,0b10001),
        'N' => g!(0b10001,0b10001,0b11001,0b10101,0b10011,0b10001,0b10001),
        'O' => g!(0b01110,0b10001,0b10001,0b10001,0b10001,0b10001,0b01110),
        'P' => g!(0b11110,0b10001,0b10001,0b11110,0b10000,0b10000,0b10000),
        'Q' => g!(0b01110,0b10001,0b10001,0b10001,0b10101,0b10010,0b01101),
        'R' => g!(0b11110,0b10001,0b10001,0b11110,0b10100,0b10010,0b10001),
        'S' => g!(0b01111,0b10000,0b10000,0b01110,0b00001,0b00001,0b11110),
        'T' => g!(0b11111,0b00100,0b00100,0b00100,0b00100,0b00100,0b00100),
        'U' => g!(0b10001,0b10001,0b10001,0b10001,0b10001,0b10001,0b01110),
        'V' => g!(0b10001,0b10001,0b10001,0b10001,0b10001,0b01010,0b00100),
        'W' => g!(0b10001,0b10001,0b10001,0b10101,0b10101,0b10101,0b01010),
        'X' => g!(0b10001,0b10001,0b01010,0b00100,0b01010,0b10001,0b10001),
        'Y' => g!(0b10001,0b10001,0b01010,0b00100,0b00100,0b00100,0b00100),
        'Z' => g!(0b11111,0b00001,0b00010,0b00100,0b01000,0b10000,0b11111),

        ' ' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00000,0b00000),
        '-' => g!(0b00000,0b00000,0b00000,0b11111,0b00000,0b00000,0b00000),
        '|' => g!(0b00100,0b00100,0b00100,0b00100,0b00100,0b00100,0b00100),
        ':' => g!(0b00000,0b00100,0b00000,0b00000,0b00100,0b00000,0b00000),
        '.' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00100,0b00000),

        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_clips_to_its_rows() {
        let mut rows = vec![0u32; 4 * 2];
        let mut band = Band::new(&mut rows, 4, 10);
        band.put_pixel(1, 9, 7);
        band.put_pixel(1, 10, 7);
        band.put_pixel(3, 11, 7);
        band.put_pixel(4, 11, 7);
        band.put_pixel(0, 12, 7);
        assert_eq!(rows, vec![0, 7, 0, 0, 0, 0, 0, 7]);
    }

    #[test]
    fn line_covers_both_endpoints() {
        let mut fb = FrameBuffer::filled(8, 8, 0);
        Band::whole(&mut fb).draw_line(1, 1, 6, 4, 9);
        assert_eq!(fb.pixels[8 + 1], 9);
        assert_eq!(fb.pixels[4 * 8 + 6], 9);
        assert_eq!(fb.pixels.iter().filter(|&&p| p == 9).count(), 6);
    }

    #[test]
    fn fill_rect_is_clipped_to_frame() {
        let mut fb = FrameBuffer::filled(6, 4, 0);
        Band::whole(&mut fb).fill_rect(Rect::new(4, 2, 10, 10), 1);
        assert_eq!(fb.pixels.iter().filter(|&&p| p == 1).count(), 4);
    }

    #[test]
    fn text_uses_uppercase_glyphs_and_scale() {
        let mut lower = FrameBuffer::filled(40, 20, 0);
        let mut upper = FrameBuffer::filled(40, 20, 0);
        Band::whole(&mut lower).draw_text(0, 0, "blur", 5, 2, None);
        Band::whole(&mut upper).draw_text(0, 0, "BLUR", 5, 2, None);
        assert_eq!(lower, upper);
        // 'I' top row is 0b01110 -> three lit glyph pixels, 2x2 each
        let mut fb = FrameBuffer::filled(12, 14, 0);
        Band::whole(&mut fb).draw_text(0, 0, "I", 5, 2, None);
        assert_eq!(fb.pixels[..12].iter().filter(|&&p| p == 5).count(), 6);
    }

    #[test]
    fn shadow_is_drawn_under_the_glyph() {
        let mut fb = FrameBuffer::filled(10, 10, 0xFFFFFF);
        Band::whole(&mut fb).draw_text(0, 0, "-", 0xAAAAAA, 1, Some(0x000000));
        // '-' is row 3, columns 0..5; shadow lands on row 4, columns 1..6
        assert_eq!(fb.pixels[3 * 10], 0xAAAAAA);
        assert_eq!(fb.pixels[4 * 10 + 5], 0x000000);
    }
}
