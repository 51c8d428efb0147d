/// Synthetic keyboard/mouse sink: emits OS-level input events via
/// `SendInput`, generalized from a fixed AI-agent shortcut set into
/// arbitrary mapping-target virtual-key codes and pointer deltas.

#[cfg(windows)]
use windows_sys::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, INPUT, INPUT_KEYBOARD, INPUT_MOUSE, KEYBDINPUT, MOUSEINPUT, KEYEVENTF_KEYUP,
    MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP, MOUSEEVENTF_MIDDLEDOWN, MOUSEEVENTF_MIDDLEUP,
    MOUSEEVENTF_MOVE, MOUSEEVENTF_RIGHTDOWN, MOUSEEVENTF_RIGHTUP, MOUSEEVENTF_WHEEL,
};

/// Virtual-key code, the mapping target's wire representation of a keyboard
/// key. Wraps the raw Win32 VK_* code so mapping configs serialize as plain
/// integers without pulling windows-sys into the config layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VKey(pub u16);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

impl MouseButton {
    pub fn from_index(i: u8) -> Option<Self> {
        match i {
            0 => Some(MouseButton::Left),
            1 => Some(MouseButton::Middle),
            2 => Some(MouseButton::Right),
            _ => None,
        }
    }
}

/// A keyboard or mouse-button edge produced by the mapping engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEdge {
    KeyPress(VKey),
    KeyRelease(VKey),
    MousePress(MouseButton),
    MouseRelease(MouseButton),
}

/// Tracks every key/button currently held so the engine can release them
/// all atomically on shutdown or disconnect, per the "no stuck keys"
/// invariant.
#[derive(Default)]
pub struct SyntheticInputSink {
    held_keys: Vec<VKey>,
    held_buttons: Vec<MouseButton>,
}

impl SyntheticInputSink {
    pub fn apply(&mut self, edges: &[InputEdge]) {
        for edge in edges {
            match *edge {
                InputEdge::KeyPress(k) => {
                    send_key(k, false);
                    if !self.held_keys.contains(&k) {
                        self.held_keys.push(k);
                    }
                }
                InputEdge::KeyRelease(k) => {
                    send_key(k, true);
                    self.held_keys.retain(|&h| h != k);
                }
                InputEdge::MousePress(b) => {
                    send_mouse_button(b, false);
                    if !self.held_buttons.contains(&b) {
                        self.held_buttons.push(b);
                    }
                }
                InputEdge::MouseRelease(b) => {
                    send_mouse_button(b, true);
                    self.held_buttons.retain(|&h| h != b);
                }
            }
        }
    }

    pub fn apply_move(&self, dx: i32, dy: i32) {
        if dx != 0 || dy != 0 {
            send_mouse_move(dx, dy);
        }
    }

    pub fn apply_scroll(&self, ticks: i32) {
        if ticks != 0 {
            send_mouse_scroll(ticks);
        }
    }

    /// Release every key/button this sink is currently holding. Called on
    /// engine shutdown and on transport loss.
    pub fn release_all(&mut self) {
        for k in std::mem::take(&mut self.held_keys) {
            send_key(k, true);
        }
        for b in std::mem::take(&mut self.held_buttons) {
            send_mouse_button(b, true);
        }
    }
}

#[cfg(windows)]
fn send_key(key: VKey, release: bool) {
    let flags = if release { KEYEVENTF_KEYUP } else { 0 };
    let input = INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: windows_sys::Win32::UI::Input::KeyboardAndMouse::INPUT_0 {
            ki: KEYBDINPUT {
                wVk: key.0,
                wScan: 0,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    };
    unsafe {
        SendInput(1, &input, std::mem::size_of::<INPUT>() as i32);
    }
}

#[cfg(not(windows))]
fn send_key(_key: VKey, _release: bool) {}

#[cfg(windows)]
fn send_mouse_button(button: MouseButton, release: bool) {
    let flags = match (button, release) {
        (MouseButton::Left, false) => MOUSEEVENTF_LEFTDOWN,
        (MouseButton::Left, true) => MOUSEEVENTF_LEFTUP,
        (MouseButton::Middle, false) => MOUSEEVENTF_MIDDLEDOWN,
        (MouseButton::Middle, true) => MOUSEEVENTF_MIDDLEUP,
        (MouseButton::Right, false) => MOUSEEVENTF_RIGHTDOWN,
        (MouseButton::Right, true) => MOUSEEVENTF_RIGHTUP,
    };
    let input = INPUT {
        r#type: INPUT_MOUSE,
        Anonymous: windows_sys::Win32::UI::Input::KeyboardAndMouse::INPUT_0 {
            mi: MOUSEINPUT {
                dx: 0,
                dy: 0,
                mouseData: 0,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    };
    unsafe {
        SendInput(1, &input, std::mem::size_of::<INPUT>() as i32);
    }
}

#[cfg(not(windows))]
fn send_mouse_button(_button: MouseButton, _release: bool) {}

#[cfg(windows)]
fn send_mouse_move(dx: i32, dy: i32) {
    let input = INPUT {
        r#type: INPUT_MOUSE,
        Anonymous: windows_sys::Win32::UI::Input::KeyboardAndMouse::INPUT_0 {
            mi: MOUSEINPUT {
                dx,
                dy,
                mouseData: 0,
                dwFlags: MOUSEEVENTF_MOVE,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    };
    unsafe {
        SendInput(1, &input, std::mem::size_of::<INPUT>() as i32);
    }
}

#[cfg(not(windows))]
fn send_mouse_move(_dx: i32, _dy: i32) {}

#[cfg(windows)]
fn send_mouse_scroll(ticks: i32) {
    const WHEEL_DELTA: i32 = 120;
    let input = INPUT {
        r#type: INPUT_MOUSE,
        Anonymous: windows_sys::Win32::UI::Input::KeyboardAndMouse::INPUT_0 {
            mi: MOUSEINPUT {
                dx: 0,
                dy: 0,
                mouseData: (ticks * WHEEL_DELTA) as u32,
                dwFlags: MOUSEEVENTF_WHEEL,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    };
    unsafe {
        SendInput(1, &input, std::mem::size_of::<INPUT>() as i32);
    }
}

#[cfg(not(windows))]
fn send_mouse_scroll(_ticks: i32) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_tracks_held_keys_until_released() {
        let mut sink = SyntheticInputSink::default();
        sink.apply(&[InputEdge::KeyPress(VKey(0x41))]);
        assert_eq!(sink.held_keys.len(), 1);
        sink.apply(&[InputEdge::KeyRelease(VKey(0x41))]);
        assert!(sink.held_keys.is_empty());
    }

    #[test]
    fn release_all_clears_and_sends_no_duplicates() {
        let mut sink = SyntheticInputSink::default();
        sink.apply(&[InputEdge::KeyPress(VKey(0x42)), InputEdge::MousePress(MouseButton::Left)]);
        sink.release_all();
        assert!(sink.held_keys.is_empty());
        assert!(sink.held_buttons.is_empty());
    }

    #[test]
    fn mouse_button_from_index() {
        assert_eq!(MouseButton::from_index(0), Some(MouseButton::Left));
        assert_eq!(MouseButton::from_index(2), Some(MouseButton::Right));
        assert_eq!(MouseButton::from_index(9), None);
    }
}
