// Input routing: window events become mode changes or a quit request.
// The window pushes `InputEvent`s into a channel; the display loop drains it
// at the top of every tick, so the active mode has exactly one writer.

use crate::modes::Mode;
use crate::overlay::button_layout;
use crate::types::ButtonRect;
use std::sync::mpsc::{Receiver, TryRecvError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputEvent {
    /// Left button went down at window pixel (x, y).
    Press { x: i32, y: i32 },
    /// A digit key 0-9.
    Digit(u8),
    /// Escape, 'q', or the window was closed.
    Quit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Control {
    Continue,
    Quit,
}

/// Mutable viewer state: which mode is active and where the buttons are.
#[derive(Clone, Debug)]
pub struct AppState {
    pub active: Mode,
    pub buttons: Vec<ButtonRect>,
}

impl AppState {
    pub fn new(initial: Mode) -> Self {
        Self { active: initial, buttons: button_layout() }
    }

    /// Apply one event. Visual: a hit button turns green on the next frame.
    pub fn apply(&mut self, event: InputEvent) -> Control {
        match event {
            InputEvent::Press { x, y } => {
                if let Some(id) = hit_test(&self.buttons, x, y) {
                    self.select(Mode::from_id(id));
                }
                Control::Continue
            }
            InputEvent::Digit(d) => {
                self.select(Mode::from_id(d as i32));
                Control::Continue
            }
            InputEvent::Quit => Control::Quit,
        }
    }

    /// Apply everything queued since the last tick. Events after a quit are
    /// dropped; a disconnected sender is treated as a quit.
    pub fn drain(&mut self, events: &Receiver<InputEvent>) -> Control {
        loop {
            match events.try_recv() {
                Ok(ev) => {
                    if self.apply(ev) == Control::Quit {
                        return Control::Quit;
                    }
                }
                Err(TryRecvError::Empty) => return Control::Continue,
                Err(TryRecvError::Disconnected) => return Control::Quit,
            }
        }
    }

    fn select(&mut self, mode: Mode) {
        if mode != self.active {
            log::info!("Mode: {} -> {}", self.active.label(), mode.label());
            self.active = mode;
        }
    }
}

/// First button (list order) containing the point.
pub fn hit_test(buttons: &[ButtonRect], x: i32, y: i32) -> Option<i32> {
    buttons.iter().find(|b| b.rect.contains(x, y)).map(|b| b.mode_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Rect;
    use std::sync::mpsc;

    #[test]
    fn click_inside_button_selects_its_mode() {
        let mut state = AppState::new(Mode::Passthrough);
        for b in button_layout() {
            let (cx, cy) = (b.rect.x + b.rect.w / 2, b.rect.y + b.rect.h / 2);
            assert_eq!(state.apply(InputEvent::Press { x: cx, y: cy }), Control::Continue);
            assert_eq!(state.active, Mode::from_id(b.mode_id));
        }
    }

    #[test]
    fn click_outside_leaves_mode_alone() {
        let mut state = AppState::new(Mode::Edges);
        state.apply(InputEvent::Press { x: 600, y: 600 });
        // the 5 px gutter between buttons 0 and 1
        state.apply(InputEvent::Press { x: 50, y: 72 });
        assert_eq!(state.active, Mode::Edges);
    }

    #[test]
    fn digit_bypasses_hit_testing() {
        let mut state = AppState::new(Mode::Passthrough);
        state.buttons.clear();
        state.apply(InputEvent::Digit(5));
        assert_eq!(state.active, Mode::Edges);
        state.apply(InputEvent::Digit(0));
        assert_eq!(state.active, Mode::Grayscale);
    }

    #[test]
    fn first_match_wins() {
        let buttons = [
            ButtonRect { rect: Rect::new(0, 0, 10, 10), mode_id: 7 },
            ButtonRect { rect: Rect::new(0, 0, 20, 20), mode_id: 2 },
        ];
        assert_eq!(hit_test(&buttons, 5, 5), Some(7));
        assert_eq!(hit_test(&buttons, 15, 15), Some(2));
        assert_eq!(hit_test(&buttons, 25, 5), None);
    }

    #[test]
    fn drain_applies_in_order_and_stops_at_quit() {
        let (tx, rx) = mpsc::channel();
        let mut state = AppState::new(Mode::Passthrough);
        tx.send(InputEvent::Digit(1)).unwrap();
        tx.send(InputEvent::Digit(3)).unwrap();
        assert_eq!(state.drain(&rx), Control::Continue);
        assert_eq!(state.active, Mode::Blur);

        tx.send(InputEvent::Quit).unwrap();
        tx.send(InputEvent::Digit(9)).unwrap();
        assert_eq!(state.drain(&rx), Control::Quit);
        assert_eq!(state.active, Mode::Blur);

        drop(tx);
        assert_eq!(state.drain(&rx), Control::Quit);
    }
}
