/// Internal representation of a virtual Xbox 360 pad frame, produced by the
/// mapping engine and consumed by the virtual pad sink. Kept independent of
/// whichever bus-driver crate does the actual plugging so the mapping engine
/// has no Windows dependency.

use bitflags::bitflags;

bitflags! {
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
    pub struct XboxButton: u16 {
        const DPAD_UP        = 0x0001;
        const DPAD_DOWN      = 0x0002;
        const DPAD_LEFT      = 0x0004;
        const DPAD_RIGHT     = 0x0008;
        const START          = 0x0010;
        const BACK           = 0x0020;
        const LEFT_THUMB     = 0x0040;
        const RIGHT_THUMB    = 0x0080;
        const LEFT_SHOULDER  = 0x0100;
        const RIGHT_SHOULDER = 0x0200;
        const GUIDE          = 0x0400;
        const A              = 0x1000;
        const B              = 0x2000;
        const X              = 0x4000;
        const Y              = 0x8000;
    }
}

/// Full virtual-pad frame for one update cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct XboxPadState {
    pub buttons: XboxButton,
    pub left_trigger: u8,
    pub right_trigger: u8,
    pub thumb_lx: i16,
    pub thumb_ly: i16,
    pub thumb_rx: i16,
    pub thumb_ry: i16,
}

/// Scale a stick axis already in -1.0..1.0 space into the signed 16-bit
/// range the virtual pad protocol expects.
pub fn scale_stick_axis(v: f32) -> i16 {
    (v.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

/// Scale a trigger/scalar value in 0.0..1.0 to a 0..255 byte.
pub fn scale_trigger(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_union_contains_both() {
        let b = XboxButton::A | XboxButton::LEFT_SHOULDER;
        assert!(b.contains(XboxButton::A));
        assert!(b.contains(XboxButton::LEFT_SHOULDER));
        assert!(!b.contains(XboxButton::B));
    }

    #[test]
    fn stick_axis_boundaries() {
        assert_eq!(scale_stick_axis(0.0), 0);
        assert_eq!(scale_stick_axis(1.0), i16::MAX);
        assert_eq!(scale_stick_axis(-1.0), -i16::MAX);
    }

    #[test]
    fn trigger_boundaries() {
        assert_eq!(scale_trigger(0.0), 0);
        assert_eq!(scale_trigger(1.0), 255);
    }
}
