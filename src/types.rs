// Core types shared by the capture, dispatch, overlay and input steps.

use image::GrayImage;

/// Single-channel 8-bit plane used by every grayscale transform.
pub type GrayFrame = GrayImage;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameBuffer {
    pub width: usize,      // how wide the frame is on screen (pixels)
    pub height: usize,     // how tall the frame is on screen (pixels)
    pub pixels: Vec<u32>,  // each entry is 0x00RRGGBB for minifb
}

impl FrameBuffer {
    /// Expand a gray plane to 0x00GGGGGG so it can be annotated and shown.
    pub fn from_gray(gray: &GrayFrame) -> Self {
        let pixels = gray
            .as_raw()
            .iter()
            .map(|&v| {
                let v = v as u32;
                (v << 16) | (v << 8) | v
            })
            .collect();
        Self {
            width: gray.width() as usize,
            height: gray.height() as usize,
            pixels,
        }
    }

    /// Luminance with the usual 0.299/0.587/0.114 weights, rounded.
    pub fn to_gray(&self) -> GrayFrame {
        let data = self
            .pixels
            .iter()
            .map(|&px| {
                let (r, g, b) = unpack_rgb(px);
                (0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32).round() as u8
            })
            .collect();
        // Length always matches width * height, so this cannot fail.
        GrayImage::from_raw(self.width as u32, self.height as u32, data)
            .unwrap_or_else(|| GrayImage::new(self.width as u32, self.height as u32))
    }
}

/// (r, g, b) to minifb's 0x00RRGGBB.
#[inline]
pub fn pack_rgb(r: u8, g: u8, b: u8) -> u32 {
    ((r as u32) << 16) | ((g as u32) << 8) | b as u32
}

#[inline]
pub fn unpack_rgb(px: u32) -> (u8, u8, u8) {
    (((px >> 16) & 0xFF) as u8, ((px >> 8) & 0xFF) as u8, (px & 0xFF) as u8)
}

/// Axis-aligned screen rectangle; contains points in `[x, x+w) x [y, y+h)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// Half-open: the right and bottom edges are outside.
    pub fn contains(&self, px: i32, py: i32) -> bool {
        px >= self.x && px < self.x + self.w && py >= self.y && py < self.y + self.h
    }

    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.x + other.w
            && other.x < self.x + self.w
            && self.y < other.y + other.h
            && other.y < self.y + self.h
    }
}

/// One clickable button as laid out for the current frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ButtonRect {
    pub rect: Rect,
    pub mode_id: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gray_round_trips_through_color_buffer() {
        let gray = GrayImage::from_raw(3, 1, vec![0, 128, 255]).unwrap();
        let fb = FrameBuffer::from_gray(&gray);
        assert_eq!(fb.pixels, vec![0x000000, 0x808080, 0xFFFFFF]);
        assert_eq!(fb.to_gray(), gray);
    }

    #[test]
    fn luminance_weights_favour_green() {
        let fb = FrameBuffer {
            width: 3,
            height: 1,
            pixels: vec![pack_rgb(255, 0, 0), pack_rgb(0, 255, 0), pack_rgb(0, 0, 255)],
        };
        assert_eq!(fb.to_gray().as_raw(), &vec![76, 150, 29]);
    }

    #[test]
    fn rect_contains_is_half_open() {
        let r = Rect::new(10, 40, 150, 30);
        assert!(r.contains(10, 40));
        assert!(r.contains(159, 69));
        assert!(!r.contains(160, 50));
        assert!(!r.contains(50, 70));
        assert!(!r.contains(9, 50));
    }
}
