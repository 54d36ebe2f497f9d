// Button column + caption painted over every output frame.
// Visual: ten gray buttons down the left edge, the active one green,
// and a white hint line above them.

use crate::draw::Band;
use crate::modes::{MODE_COUNT, Mode};
use crate::types::{ButtonRect, FrameBuffer, Rect};

pub const ORIGIN: (i32, i32) = (10, 40);
pub const BUTTON_W: i32 = 150;
pub const BUTTON_H: i32 = 30;
pub const GUTTER: i32 = 5;

pub const ACTIVE_FILL: u32 = 0x00_00_FF_00;
pub const INACTIVE_FILL: u32 = 0x00_C8_C8_C8;
const LABEL_COLOR: u32 = 0x00_00_00_00;
const CAPTION_COLOR: u32 = 0x00_FF_FF_FF;
const TEXT_SCALE: i32 = 2;

pub const CAPTION: &str = "Click buttons or press 0-9";

/// Fixed vertical stack, one rectangle per mode, top to bottom in id order.
pub fn button_layout() -> Vec<ButtonRect> {
    let buttons: Vec<ButtonRect> = (0..MODE_COUNT as i32)
        .map(|i| ButtonRect {
            rect: Rect::new(ORIGIN.0, ORIGIN.1 + i * (BUTTON_H + GUTTER), BUTTON_W, BUTTON_H),
            mode_id: i,
        })
        .collect();
    debug_assert!(buttons.windows(2).all(|p| !p[0].rect.overlaps(&p[1].rect)));
    buttons
}

/// Paint the buttons (highlighting `active`) and the caption onto `fb`,
/// returning the rectangles that hit-testing should use from now on.
pub fn draw_overlay(fb: &mut FrameBuffer, active: Mode) -> Vec<ButtonRect> {
    let buttons = button_layout();
    let mut band = Band::whole(fb);
    let active_id = active.id();

    for b in &buttons {
        let fill = if Some(b.mode_id) == active_id { ACTIVE_FILL } else { INACTIVE_FILL };
        band.fill_rect(b.rect, fill);
        let label = Mode::from_id(b.mode_id).label();
        band.draw_text(b.rect.x + 5, b.rect.y + 8, label, LABEL_COLOR, TEXT_SCALE, None);
    }
    band.draw_text(ORIGIN.0, 12, CAPTION, CAPTION_COLOR, TEXT_SCALE, Some(0));
    buttons
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_has_one_button_per_mode_without_overlap() {
        let buttons = button_layout();
        assert_eq!(buttons.len(), MODE_COUNT);
        for (i, a) in buttons.iter().enumerate() {
            assert_eq!(a.mode_id, i as i32);
            for b in &buttons[i + 1..] {
                assert!(!a.rect.overlaps(&b.rect));
            }
        }
        assert_eq!(buttons[0].rect, Rect::new(10, 40, 150, 30));
        assert_eq!(buttons[9].rect, Rect::new(10, 355, 150, 30));
    }

    #[test]
    fn active_button_is_green() {
        let mut fb = FrameBuffer::filled(200, 400, 0x123456);
        let buttons = draw_overlay(&mut fb, Mode::Blur);
        // top-left corner of each button is never covered by label text
        let corner = |b: &ButtonRect| fb.pixels[b.rect.y as usize * 200 + b.rect.x as usize];
        assert_eq!(corner(&buttons[3]), ACTIVE_FILL);
        assert_eq!(corner(&buttons[0]), INACTIVE_FILL);
        assert_eq!(corner(&buttons[9]), INACTIVE_FILL);
    }

    #[test]
    fn passthrough_highlights_nothing() {
        let mut fb = FrameBuffer::filled(200, 400, 0);
        let buttons = draw_overlay(&mut fb, Mode::Passthrough);
        assert_eq!(buttons, button_layout());
        assert!(!fb.pixels.contains(&ACTIVE_FILL));
        assert!(fb.pixels.contains(&CAPTION_COLOR));
    }

    #[test]
    fn overlay_survives_tiny_frames() {
        let mut fb = FrameBuffer::filled(8, 8, 0);
        assert_eq!(draw_overlay(&mut fb, Mode::Grayscale).len(), MODE_COUNT);
    }
}
