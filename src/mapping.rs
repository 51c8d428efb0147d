/// Mapping Engine: translates a decoded `GamepadState` into a virtual-pad
/// frame plus synthetic input edges/pointer events, via a user-configurable
/// Source → [Target] table.
///
/// Generalizes the teacher's fixed AI-agent shortcut mapper (which hardwired
/// Cross→Enter, Circle→Escape, ...) into an open Source/Target pair with
/// exhaustive dispatch, while keeping its rising-edge detection idiom
/// (`on_press!`-style comparison against the previous frame).

use crate::input::{apply_deadzone, ButtonState, GamepadState};
use crate::synthetic_input::{InputEdge, MouseButton, VKey};
use crate::xbox::{scale_stick_axis, scale_trigger, XboxButton, XboxPadState};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A physical (or synthetic touchpad-half) input that can be mapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    Cross,
    Circle,
    Square,
    Triangle,
    L1,
    R1,
    L2,
    R2,
    L3,
    R3,
    Share,
    Options,
    Ps,
    Mute,
    Touchpad,
    DpadUp,
    DpadDown,
    DpadLeft,
    DpadRight,
    LeftStick,
    RightStick,
    TouchpadLeft,
    TouchpadRight,
}

pub const ALL_SOURCES: &[Source] = &[
    Source::Cross, Source::Circle, Source::Square, Source::Triangle,
    Source::L1, Source::R1, Source::L2, Source::R2, Source::L3, Source::R3,
    Source::Share, Source::Options, Source::Ps, Source::Mute, Source::Touchpad,
    Source::DpadUp, Source::DpadDown, Source::DpadLeft, Source::DpadRight,
    Source::LeftStick, Source::RightStick, Source::TouchpadLeft, Source::TouchpadRight,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum XboxStickSide {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum XboxTriggerSide {
    Left,
    Right,
}

/// What a mapping entry produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Target {
    XboxButton(u16), // XboxButton bits, serialized as a plain integer
    XboxTrigger(XboxTriggerSide),
    XboxStick(XboxStickSide),
    Keyboard(u16), // VK_* code
    Mouse(u8),     // 0=Left,1=Middle,2=Right
    MouseMove { x_speed: f32, y_speed: f32 },
    MouseScroll { speed: f32 },
}

pub type MappingSet = HashMap<Source, Vec<Target>>;

/// The default mapping: face/shoulder/meta buttons one-to-one to Xbox
/// equivalents, sticks to LS/RS, triggers to LT/RT, everything else empty.
pub fn default_mapping() -> MappingSet {
    let mut m: MappingSet = ALL_SOURCES.iter().map(|s| (*s, Vec::new())).collect();
    m.insert(Source::Cross, vec![Target::XboxButton(XboxButton::A.bits())]);
    m.insert(Source::Circle, vec![Target::XboxButton(XboxButton::B.bits())]);
    m.insert(Source::Square, vec![Target::XboxButton(XboxButton::X.bits())]);
    m.insert(Source::Triangle, vec![Target::XboxButton(XboxButton::Y.bits())]);
    m.insert(Source::L1, vec![Target::XboxButton(XboxButton::LEFT_SHOULDER.bits())]);
    m.insert(Source::R1, vec![Target::XboxButton(XboxButton::RIGHT_SHOULDER.bits())]);
    m.insert(Source::L3, vec![Target::XboxButton(XboxButton::LEFT_THUMB.bits())]);
    m.insert(Source::R3, vec![Target::XboxButton(XboxButton::RIGHT_THUMB.bits())]);
    m.insert(Source::Share, vec![Target::XboxButton(XboxButton::BACK.bits())]);
    m.insert(Source::Options, vec![Target::XboxButton(XboxButton::START.bits())]);
    m.insert(Source::Ps, vec![Target::XboxButton(XboxButton::GUIDE.bits())]);
    m.insert(Source::DpadUp, vec![Target::XboxButton(XboxButton::DPAD_UP.bits())]);
    m.insert(Source::DpadDown, vec![Target::XboxButton(XboxButton::DPAD_DOWN.bits())]);
    m.insert(Source::DpadLeft, vec![Target::XboxButton(XboxButton::DPAD_LEFT.bits())]);
    m.insert(Source::DpadRight, vec![Target::XboxButton(XboxButton::DPAD_RIGHT.bits())]);
    m.insert(Source::L2, vec![Target::XboxTrigger(XboxTriggerSide::Left)]);
    m.insert(Source::R2, vec![Target::XboxTrigger(XboxTriggerSide::Right)]);
    m.insert(Source::LeftStick, vec![Target::XboxStick(XboxStickSide::Left)]);
    m.insert(Source::RightStick, vec![Target::XboxStick(XboxStickSide::Right)]);
    m
}

/// Evaluated value of a source for one frame.
enum Value {
    Digital(bool),
    Scalar(f32),
    Vector(f32, f32),
}

fn digital_value(buttons: &ButtonState, source: Source) -> Option<bool> {
    Some(match source {
        Source::Cross => buttons.cross,
        Source::Circle => buttons.circle,
        Source::Square => buttons.square,
        Source::Triangle => buttons.triangle,
        Source::L1 => buttons.l1,
        Source::R1 => buttons.r1,
        Source::L3 => buttons.l3,
        Source::R3 => buttons.r3,
        Source::Share => buttons.share,
        Source::Options => buttons.options,
        Source::Ps => buttons.ps,
        Source::Mute => buttons.mute,
        Source::Touchpad => buttons.touchpad,
        Source::DpadUp => buttons.dpad_up,
        Source::DpadDown => buttons.dpad_down,
        Source::DpadLeft => buttons.dpad_left,
        Source::DpadRight => buttons.dpad_right,
        Source::L2 | Source::R2 | Source::LeftStick | Source::RightStick
        | Source::TouchpadLeft | Source::TouchpadRight => return None,
    })
}

/// Per-cycle mapping parameters owned by EngineConfig, threaded through so
/// the mapping engine stays free of a direct EngineConfig dependency.
#[derive(Debug, Clone, Copy)]
pub struct MappingParams {
    pub deadzone_left: f32,
    pub deadzone_right: f32,
}

/// The mapping engine's per-connection state: previous frame (for edge
/// detection) and fractional mouse/scroll accumulators.
#[derive(Default)]
pub struct MappingEngine {
    prev: Option<GamepadState>,
    move_accum: HashMap<usize, (f32, f32)>,
    scroll_accum: HashMap<usize, f32>,
}

fn evaluate(state: &GamepadState, params: &MappingParams, source: Source) -> Value {
    if let Some(b) = digital_value(&state.buttons, source) {
        return Value::Digital(b);
    }
    match source {
        Source::L2 => Value::Scalar(state.l2),
        Source::R2 => Value::Scalar(state.r2),
        Source::LeftStick => {
            let (x, y) = apply_deadzone(state.left_stick.0, state.left_stick.1, params.deadzone_left);
            Value::Vector(x, y)
        }
        Source::RightStick => {
            let (x, y) = apply_deadzone(state.right_stick.0, state.right_stick.1, params.deadzone_right);
            Value::Vector(x, y)
        }
        Source::TouchpadLeft => {
            let t = state.touchpad[0];
            Value::Digital(t.active && state.buttons.touchpad && t.x < 960)
        }
        Source::TouchpadRight => {
            let t = state.touchpad[0];
            Value::Digital(t.active && state.buttons.touchpad && t.x >= 960)
        }
        _ => unreachable!("digital_value covers every remaining source"),
    }
}

/// Touchpad motion, normalized to roughly the same per-frame unit the
/// stick-driven MouseMove target uses (touchpad units / frame, scaled by
/// the configured touchpad sensitivity before being fed into the same
/// accumulator math as stick-driven movement — see SPEC_FULL.md §4.5/§9).
fn touchpad_vector(state: &GamepadState, prev: Option<&GamepadState>) -> (f32, f32) {
    let t = state.touchpad[0];
    if !t.active {
        return (0.0, 0.0);
    }
    match prev.map(|p| p.touchpad[0]) {
        Some(pt) if pt.active => (
            (t.x as f32 - pt.x as f32) / 1920.0,
            (t.y as f32 - pt.y as f32) / 1080.0,
        ),
        _ => (0.0, 0.0),
    }
}

impl MappingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one cycle. `key` index values let multiple MouseMove/MouseScroll
    /// targets keep independent accumulators.
    pub fn process(
        &mut self,
        state: &GamepadState,
        mapping: &MappingSet,
        params: &MappingParams,
    ) -> (XboxPadState, Vec<InputEdge>, Vec<(i32, i32)>, Vec<i32>) {
        let mut pad = XboxPadState::default();
        let mut edges = Vec::new();
        let mut moves = Vec::new();
        let mut scrolls = Vec::new();

        let prev_buttons = self.prev.as_ref().map(|p| p.buttons);

        for (idx, source) in ALL_SOURCES.iter().enumerate() {
            let targets = match mapping.get(source) {
                Some(t) if !t.is_empty() => t,
                _ => continue,
            };
            let value = evaluate(state, params, *source);
            let was_pressed = prev_buttons
                .and_then(|pb| digital_value(&pb, *source))
                .unwrap_or(false);

            for target in targets {
                match target {
                    Target::XboxButton(bits) => {
                        if let Value::Digital(true) = value {
                            pad.buttons |= XboxButton::from_bits_truncate(*bits);
                        }
                    }
                    Target::XboxTrigger(side) => {
                        let scalar = match value {
                            Value::Scalar(s) => s,
                            Value::Digital(true) => 1.0,
                            _ => 0.0,
                        };
                        match side {
                            XboxTriggerSide::Left => pad.left_trigger = scale_trigger(scalar),
                            XboxTriggerSide::Right => pad.right_trigger = scale_trigger(scalar),
                        }
                    }
                    Target::XboxStick(side) => {
                        if let Value::Vector(x, y) = value {
                            match side {
                                XboxStickSide::Left => {
                                    pad.thumb_lx = scale_stick_axis(x);
                                    pad.thumb_ly = scale_stick_axis(y);
                                }
                                XboxStickSide::Right => {
                                    pad.thumb_rx = scale_stick_axis(x);
                                    pad.thumb_ry = scale_stick_axis(y);
                                }
                            }
                        }
                    }
                    Target::Keyboard(vk) => {
                        if let Value::Digital(pressed) = value {
                            if pressed && !was_pressed {
                                edges.push(InputEdge::KeyPress(VKey(*vk)));
                            } else if !pressed && was_pressed {
                                edges.push(InputEdge::KeyRelease(VKey(*vk)));
                            }
                        }
                    }
                    Target::Mouse(idx_btn) => {
                        if let (Value::Digital(pressed), Some(btn)) =
                            (&value, MouseButton::from_index(*idx_btn))
                        {
                            if *pressed && !was_pressed {
                                edges.push(InputEdge::MousePress(btn));
                            } else if !*pressed && was_pressed {
                                edges.push(InputEdge::MouseRelease(btn));
                            }
                        }
                    }
                    Target::MouseMove { x_speed, y_speed } => {
                        let (vx, vy) = match (*source, value) {
                            (Source::Touchpad | Source::TouchpadLeft | Source::TouchpadRight, _) => {
                                touchpad_vector(state, self.prev.as_ref())
                            }
                            (_, Value::Vector(x, y)) => (x, y),
                            _ => (0.0, 0.0),
                        };
                        let accum = self.move_accum.entry(idx).or_insert((0.0, 0.0));
                        accum.0 += vx * x_speed;
                        accum.1 += vy * y_speed;
                        let dx = accum.0.trunc();
                        let dy = accum.1.trunc();
                        accum.0 -= dx;
                        accum.1 -= dy;
                        if dx != 0.0 || dy != 0.0 {
                            moves.push((dx as i32, dy as i32));
                        }
                    }
                    Target::MouseScroll { speed } => {
                        let vy = match value {
                            Value::Vector(_, y) => y,
                            _ => 0.0,
                        };
                        let accum = self.scroll_accum.entry(idx).or_insert(0.0);
                        *accum += vy * speed;
                        let ticks = accum.trunc();
                        *accum -= ticks;
                        if ticks != 0.0 {
                            scrolls.push(ticks as i32);
                        }
                    }
                }
            }
        }

        self.prev = Some(state.clone());
        (pad, edges, moves, scrolls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> MappingParams {
        MappingParams { deadzone_left: 0.1, deadzone_right: 0.1 }
    }

    #[test]
    fn default_mapping_has_every_source() {
        let m = default_mapping();
        for s in ALL_SOURCES {
            assert!(m.contains_key(s));
        }
    }

    #[test]
    fn cross_maps_to_xbox_a() {
        let mut engine = MappingEngine::new();
        let mapping = default_mapping();
        let mut state = GamepadState::default();
        state.buttons.cross = true;
        let (pad, _, _, _) = engine.process(&state, &mapping, &params());
        assert!(pad.buttons.contains(XboxButton::A));
    }

    #[test]
    fn remapped_triangle_to_keyboard_excludes_xbox_y() {
        let mut engine = MappingEngine::new();
        let mut mapping = default_mapping();
        mapping.insert(Source::Triangle, vec![Target::Keyboard(0x46)]); // 'F'
        let mut state = GamepadState::default();
        state.buttons.triangle = true;
        let (pad, edges, _, _) = engine.process(&state, &mapping, &params());
        assert!(!pad.buttons.contains(XboxButton::Y));
        assert_eq!(edges, vec![InputEdge::KeyPress(VKey(0x46))]);
    }

    #[test]
    fn keyboard_target_emits_release_on_falling_edge() {
        let mut engine = MappingEngine::new();
        let mut mapping = default_mapping();
        mapping.insert(Source::Cross, vec![Target::Keyboard(0x0D)]);
        let mut pressed = GamepadState::default();
        pressed.buttons.cross = true;
        let (_, edges, _, _) = engine.process(&pressed, &mapping, &params());
        assert_eq!(edges, vec![InputEdge::KeyPress(VKey(0x0D))]);

        let released = GamepadState::default();
        let (_, edges, _, _) = engine.process(&released, &mapping, &params());
        assert_eq!(edges, vec![InputEdge::KeyRelease(VKey(0x0D))]);
    }

    #[test]
    fn holding_produces_no_repeat_edges() {
        let mut engine = MappingEngine::new();
        let mut mapping = default_mapping();
        mapping.insert(Source::Cross, vec![Target::Keyboard(0x0D)]);
        let mut state = GamepadState::default();
        state.buttons.cross = true;
        let (_, edges1, _, _) = engine.process(&state, &mapping, &params());
        assert_eq!(edges1.len(), 1);
        let (_, edges2, _, _) = engine.process(&state, &mapping, &params());
        assert!(edges2.is_empty());
    }

    #[test]
    fn dual_targets_fire_independently() {
        let mut engine = MappingEngine::new();
        let mut mapping = default_mapping();
        mapping.insert(
            Source::Cross,
            vec![Target::XboxButton(XboxButton::A.bits()), Target::Keyboard(0x0D)],
        );
        let mut state = GamepadState::default();
        state.buttons.cross = true;
        let (pad, edges, _, _) = engine.process(&state, &mapping, &params());
        assert!(pad.buttons.contains(XboxButton::A));
        assert_eq!(edges, vec![InputEdge::KeyPress(VKey(0x0D))]);
    }

    #[test]
    fn triggers_scale_into_xbox_byte_range() {
        let mut engine = MappingEngine::new();
        let mapping = default_mapping();
        let mut state = GamepadState::default();
        state.r2 = 1.0;
        let (pad, _, _, _) = engine.process(&state, &mapping, &params());
        assert_eq!(pad.right_trigger, 255);
    }
}
