// The on-screen window: shows each annotated frame and turns mouse/keyboard
// state into `InputEvent`s for the display loop.

use crate::error::Error;
use crate::input::InputEvent;
use crate::types::FrameBuffer;
use minifb::{InputCallback, Key, MouseButton, MouseMode, Window, WindowOptions};
use std::sync::mpsc::Sender;

/// Where finished frames go, and where input comes from.
pub trait Presenter {
    fn present(&mut self, frame: &FrameBuffer) -> Result<(), Error>;
    /// Push whatever input arrived since the last call.
    fn poll_input(&mut self, events: &Sender<InputEvent>);
}

impl<P: Presenter + ?Sized> Presenter for &mut P {
    fn present(&mut self, frame: &FrameBuffer) -> Result<(), Error> {
        (**self).present(frame)
    }

    fn poll_input(&mut self, events: &Sender<InputEvent>) {
        (**self).poll_input(events)
    }
}

pub struct Drawer {
    window: Window,
    left_was_down: bool,
    keys_hooked: bool,
}

/// Receives every key transition minifb sees while pumping window events,
/// so a tap shorter than one tick still arrives.
struct KeyForwarder {
    events: Sender<InputEvent>,
}

impl InputCallback for KeyForwarder {
    fn add_char(&mut self, _uni_char: u32) {}

    fn set_key_state(&mut self, key: Key, down: bool) {
        if down {
            if let Some(ev) = key_event(key) {
                let _ = self.events.send(ev);
            }
        }
    }
}

impl Drawer {
    /// Create a window sized to the working frame.
    pub fn new(title: &str, width: usize, height: usize) -> Result<Self, Error> {
        let window = Window::new(title, width, height, WindowOptions::default())
            .map_err(|e| Error::WindowInit(e.to_string()))?;
        Ok(Self { window, left_was_down: false, keys_hooked: false })
    }

    /// Current mouse position in window pixel coordinates, if inside.
    fn mouse_pos(&self) -> Option<(i32, i32)> {
        self.window
            .get_mouse_pos(MouseMode::Discard)
            .map(|(x, y)| (x as i32, y as i32))
    }
}

impl Presenter for Drawer {
    fn present(&mut self, framebuffer: &FrameBuffer) -> Result<(), Error> {
        self.window
            .update_with_buffer(&framebuffer.pixels, framebuffer.width, framebuffer.height)
            .map_err(|e| Error::WindowUpdate(e.to_string()))
    }

    fn poll_input(&mut self, events: &Sender<InputEvent>) {
        if !self.keys_hooked {
            let forwarder = KeyForwarder { events: events.clone() };
            self.window.set_input_callback(Box::new(forwarder));
            self.keys_hooked = true;
        }

        let mut out = Vec::new();

        if !self.window.is_open() {
            out.push(InputEvent::Quit);
        }

        // Only the press edge counts as a click; holding the button does nothing.
        // The mouse is sampled once per tick (minifb has no click callback).
        let left_down = self.window.get_mouse_down(MouseButton::Left);
        if left_down && !self.left_was_down {
            if let Some((x, y)) = self.mouse_pos() {
                out.push(InputEvent::Press { x, y });
            }
        }
        self.left_was_down = left_down;

        for ev in out {
            // The loop owns the receiver; if it is gone there is nobody to tell.
            if events.send(ev).is_err() {
                break;
            }
        }
    }
}

fn key_event(key: Key) -> Option<InputEvent> {
    let digit = match key {
        Key::Escape | Key::Q => return Some(InputEvent::Quit),
        Key::Key0 | Key::NumPad0 => 0,
        Key::Key1 | Key::NumPad1 => 1,
        Key::Key2 | Key::NumPad2 => 2,
        Key::Key3 | Key::NumPad3 => 3,
        Key::Key4 | Key::NumPad4 => 4,
        Key::Key5 | Key::NumPad5 => 5,
        Key::Key6 | Key::NumPad6 => 6,
        Key::Key7 | Key::NumPad7 => 7,
        Key::Key8 | Key::NumPad8 => 8,
        Key::Key9 | Key::NumPad9 => 9,
        _ => return None,
    };
    Some(InputEvent::Digit(digit))
}
