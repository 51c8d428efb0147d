/// Output report builder: desired controller state → raw HID bytes.
///
/// Report formats:
///
/// DualSense USB: Report ID 0x02, 48 bytes
///   Byte 0:  report ID (0x02)
///   Byte 1:  valid flag 0 (0x01 = rumble, 0x02 = right trigger effect, 0x04 = left trigger)
///   Byte 2:  valid flag 1 (0x04 = lightbar, 0x01 = mic LED, 0x02 = player LEDs)
///   Byte 3:  right rumble motor
///   Byte 4:  left rumble motor
///   Bytes 5..16:  right trigger (R2) adaptive-trigger descriptor, 11 bytes
///   Bytes 16..27: left trigger (L2) adaptive-trigger descriptor, 11 bytes
///   Byte 44: player LEDs
///   Byte 45: lightbar red
///   Byte 46: lightbar green
///   Byte 47: lightbar blue
///
/// DualSense BT: Report ID 0x31, 78 bytes
///   Byte 0:  report ID (0x31)
///   Byte 1:  fixed tag 0x02
///   Then same layout as USB offset by +1
///   Last 4 bytes: CRC-32 (seed 0xA2)
///
/// DS4 USB: Report ID 0x05, 32 bytes (no adaptive triggers — hardware has none)
///   Byte 4:  right rumble motor
///   Byte 5:  left rumble motor
///   Byte 6:  lightbar red
///   Byte 7:  lightbar green
///   Byte 8:  lightbar blue
///
/// DS4 BT: Report ID 0x11, 79 bytes
///   Byte 6:  right rumble motor
///   Byte 7:  left rumble motor
///   Byte 8:  lightbar red
///   Byte 9:  lightbar green
///   Byte 10: lightbar blue
///   Last 4 bytes: CRC-32 (seed 0xA2)

use crate::controller::{ConnectionType, ControllerType};
use crate::crc32;
use serde::{Deserialize, Serialize};

/// Adaptive trigger effect mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TriggerMode {
    #[default]
    Off,
    Rigid,
    Pulse,
    Section,
}

/// One trigger's adaptive-feedback configuration. `start`/`force` are in
/// the same 0..255 unit the rest of the engine uses for analog scale; they
/// are rescaled into the device's native 0..9 / 0..8 zone ranges at encode
/// time.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AdaptiveTrigger {
    pub mode: TriggerMode,
    pub start: u8,
    pub force: u8,
}

fn trigger_opcode(mode: TriggerMode) -> u8 {
    match mode {
        TriggerMode::Off => 0x00,
        TriggerMode::Rigid => 0x01,
        TriggerMode::Pulse => 0x02,
        TriggerMode::Section => 0x06,
    }
}

/// Encode an 11-byte adaptive trigger descriptor.
fn encode_trigger(t: &AdaptiveTrigger) -> [u8; 11] {
    let mut block = [0u8; 11];
    if t.mode == TriggerMode::Off {
        return block;
    }
    block[0] = trigger_opcode(t.mode);
    block[1] = ((t.start as u16 * 9) / 255) as u8;
    block[2] = ((t.force as u16 * 8) / 255) as u8;
    block
}

/// Player-LED mask from a battery percentage, per the fixed threshold table.
/// When `show_battery_led` is false, the indicator collapses to a single
/// fixed center dot regardless of battery level.
pub fn player_led_mask(battery_percent: u8, show_battery_led: bool) -> u8 {
    if !show_battery_led {
        return 0x04;
    }
    match battery_percent {
        90..=100 => 0x1F,
        70..=89 => 0x0F,
        50..=69 => 0x07,
        30..=49 => 0x03,
        10..=29 => 0x01,
        _ => 0x00,
    }
}

/// Desired output state to send to the controller.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputState {
    pub lightbar_r: u8,
    pub lightbar_g: u8,
    pub lightbar_b: u8,
    pub rumble_left: u8,
    pub rumble_right: u8,
    /// Player indicator LED bitmask (DualSense only).
    /// Bits 0-4 = 5 dots left→right. Bit 5 = instant mode (no fade).
    pub player_leds: u8,
    pub mute_led: u8,
    pub trigger_l2: AdaptiveTrigger,
    pub trigger_r2: AdaptiveTrigger,
}

/// Build an output report. Returns the report as a Vec<u8> ready to write via HID.
pub fn build_report(ct: ControllerType, conn: ConnectionType, state: &OutputState) -> Vec<u8> {
    match (ct, conn) {
        (ControllerType::DualSense | ControllerType::DualSenseEdge, ConnectionType::Usb) => {
            build_dualsense_usb(state)
        }
        (ControllerType::DualSense | ControllerType::DualSenseEdge, ConnectionType::Bluetooth) => {
            build_dualsense_bt(state)
        }
        (ControllerType::Ds4V1 | ControllerType::Ds4V2, ConnectionType::Usb) => {
            build_ds4_usb(state)
        }
        (ControllerType::Ds4V1 | ControllerType::Ds4V2, ConnectionType::Bluetooth) => {
            build_ds4_bt(state)
        }
    }
}

/// DualSense USB output report. Total: 48 bytes. Report ID 0x02.
fn build_dualsense_usb(state: &OutputState) -> Vec<u8> {
    let mut buf = vec![0u8; 48];
    buf[0] = 0x02; // report ID
    buf[1] = 0x0F; // valid_flag0: rumble + both trigger effects
    buf[2] = 0x55; // valid_flag1: mic LED + lightbar + player LEDs + power
    buf[3] = state.rumble_right;
    buf[4] = state.rumble_left;
    buf[5..16].copy_from_slice(&encode_trigger(&state.trigger_r2));
    buf[16..27].copy_from_slice(&encode_trigger(&state.trigger_l2));
    buf[39] = 0x02; // valid_flag2: lightbar setup control enable
    buf[42] = 0x02; // lightbar_setup: fade out default blue LED
    buf[43] = 0x00; // led_brightness: 0x00=High
    buf[44] = state.player_leds;
    buf[45] = state.lightbar_r;
    buf[46] = state.lightbar_g;
    buf[47] = state.lightbar_b;
    buf
}

/// DualSense BT output report. Total: 78 bytes. Report ID 0x31.
/// A fixed tag (no rolling sequence) matches upstream DS4Windows behavior.
fn build_dualsense_bt(state: &OutputState) -> Vec<u8> {
    let mut buf = vec![0u8; 78];
    buf[0] = 0x31; // report ID
    buf[1] = 0x02; // fixed data tag
    buf[2] = 0x0F; // valid_flag0
    buf[3] = 0x55; // valid_flag1
    buf[4] = state.rumble_right;
    buf[5] = state.rumble_left;
    buf[6..17].copy_from_slice(&encode_trigger(&state.trigger_r2));
    buf[17..28].copy_from_slice(&encode_trigger(&state.trigger_l2));
    buf[40] = 0x02; // valid_flag2
    buf[43] = 0x02; // lightbar_setup
    buf[44] = 0x00; // led_brightness
    buf[45] = state.player_leds;
    buf[46] = state.lightbar_r;
    buf[47] = state.lightbar_g;
    buf[48] = state.lightbar_b;

    let crc_offset = buf.len() - 4;
    crc32::stamp(crc32::SEED_OUTPUT, &mut buf, crc_offset);
    buf
}

fn build_ds4_usb(state: &OutputState) -> Vec<u8> {
    let mut buf = vec![0u8; 32];
    buf[0] = 0x05; // report ID
    buf[1] = 0x07; // flags: rumble + lightbar
    buf[4] = state.rumble_right;
    buf[5] = state.rumble_left;
    buf[6] = state.lightbar_r;
    buf[7] = state.lightbar_g;
    buf[8] = state.lightbar_b;
    buf
}

fn build_ds4_bt(state: &OutputState) -> Vec<u8> {
    let mut buf = vec![0u8; 79];
    buf[0] = 0x11; // report ID
    buf[1] = 0x80; // HID output flag
    buf[3] = 0xF7; // enable rumble + lightbar + flash
    buf[6] = state.rumble_right;
    buf[7] = state.rumble_left;
    buf[8] = state.lightbar_r;
    buf[9] = state.lightbar_g;
    buf[10] = state.lightbar_b;

    let crc_offset = buf.len() - 4;
    crc32::stamp(crc32::SEED_OUTPUT, &mut buf, crc_offset);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dualsense_usb_report_size() {
        let state = OutputState {
            lightbar_r: 255,
            lightbar_g: 128,
            lightbar_b: 0,
            ..Default::default()
        };
        let report = build_report(ControllerType::DualSense, ConnectionType::Usb, &state);
        assert_eq!(report.len(), 48);
        assert_eq!(report[0], 0x02);
        assert_eq!(report[45], 255);
        assert_eq!(report[46], 128);
        assert_eq!(report[47], 0);
    }

    #[test]
    fn dualsense_player_leds_byte_position() {
        let state = OutputState { player_leds: 0x24, ..Default::default() };
        let usb = build_report(ControllerType::DualSense, ConnectionType::Usb, &state);
        assert_eq!(usb[44], 0x24);
        let bt = build_report(ControllerType::DualSense, ConnectionType::Bluetooth, &state);
        assert_eq!(bt[45], 0x24);
    }

    #[test]
    fn dualsense_bt_report_size_and_crc() {
        let state = OutputState::default();
        let report = build_report(ControllerType::DualSense, ConnectionType::Bluetooth, &state);
        assert_eq!(report.len(), 78);
        assert_eq!(report[0], 0x31);
        assert!(crc32::validate(crc32::SEED_OUTPUT, &report));
    }

    #[test]
    fn ds4_usb_report_size() {
        let state = OutputState {
            lightbar_g: 255,
            rumble_left: 128,
            rumble_right: 64,
            ..Default::default()
        };
        let report = build_report(ControllerType::Ds4V2, ConnectionType::Usb, &state);
        assert_eq!(report.len(), 32);
        assert_eq!(report[0], 0x05);
        assert_eq!(report[5], 128);
        assert_eq!(report[4], 64);
        assert_eq!(report[7], 255);
    }

    #[test]
    fn ds4_bt_report_size_and_crc() {
        let state = OutputState::default();
        let report = build_report(ControllerType::Ds4V2, ConnectionType::Bluetooth, &state);
        assert_eq!(report.len(), 79);
        assert_eq!(report[0], 0x11);
        assert!(crc32::validate(crc32::SEED_OUTPUT, &report));
    }

    #[test]
    fn dualsense_bt_fixed_tag() {
        let state = OutputState::default();
        let r1 = build_report(ControllerType::DualSense, ConnectionType::Bluetooth, &state);
        let r2 = build_report(ControllerType::DualSense, ConnectionType::Bluetooth, &state);
        assert_eq!(r1[1], 0x02);
        assert_eq!(r2[1], 0x02);
    }

    #[test]
    fn adaptive_trigger_off_is_all_zero() {
        let t = AdaptiveTrigger { mode: TriggerMode::Off, start: 200, force: 200 };
        assert_eq!(encode_trigger(&t), [0u8; 11]);
    }

    #[test]
    fn adaptive_trigger_rigid_vs_pulse_diverge() {
        let rigid = AdaptiveTrigger { mode: TriggerMode::Rigid, start: 128, force: 255 };
        let pulse = AdaptiveTrigger { mode: TriggerMode::Pulse, start: 128, force: 255 };
        assert_ne!(encode_trigger(&rigid)[0], encode_trigger(&pulse)[0]);
    }

    #[test]
    fn adaptive_trigger_scales_into_device_zone_ranges() {
        let t = AdaptiveTrigger { mode: TriggerMode::Rigid, start: 255, force: 255 };
        let block = encode_trigger(&t);
        assert_eq!(block[1], 9); // start zone max
        assert_eq!(block[2], 8); // force zone max
    }

    #[test]
    fn player_led_mask_thresholds() {
        assert_eq!(player_led_mask(9, true), 0x00);
        assert_eq!(player_led_mask(10, true), 0x01);
        assert_eq!(player_led_mask(29, true), 0x01);
        assert_eq!(player_led_mask(30, true), 0x03);
        assert_eq!(player_led_mask(49, true), 0x03);
        assert_eq!(player_led_mask(50, true), 0x07);
        assert_eq!(player_led_mask(69, true), 0x07);
        assert_eq!(player_led_mask(70, true), 0x0F);
        assert_eq!(player_led_mask(89, true), 0x0F);
        assert_eq!(player_led_mask(90, true), 0x1F);
    }

    #[test]
    fn player_led_mask_override_ignores_battery() {
        assert_eq!(player_led_mask(95, false), 0x04);
        assert_eq!(player_led_mask(0, false), 0x04);
    }
}
