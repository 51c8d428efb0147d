/// Engine configuration with sensible defaults. Persisted as a field of
/// `Profile` (see `profile.rs`) rather than its own file — there is one
/// active `EngineConfig` per saved profile, not a single global one.

use crate::output::AdaptiveTrigger;
use serde::{Deserialize, Serialize};

/// Top-level engine configuration: everything the UI can change that isn't
/// a per-mapping binding (those live in a `Profile`, see `profile.rs`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub hide_controller: bool,
    pub start_minimized: bool,
    pub deadzone_left: f32,
    pub deadzone_right: f32,
    pub mouse_sens_left: f32,
    pub mouse_sens_right: f32,
    pub mouse_sens_touchpad: f32,
    pub rgb: RgbConfig,
    pub show_battery_led: bool,
    pub player_led_brightness: LedBrightness,
    pub trigger_l2: AdaptiveTrigger,
    pub trigger_r2: AdaptiveTrigger,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RgbConfig {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub brightness: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedBrightness {
    Low,
    Medium,
    High,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hide_controller: false,
            start_minimized: false,
            deadzone_left: 0.1,
            deadzone_right: 0.1,
            mouse_sens_left: 0.0,
            mouse_sens_right: 12.0,
            mouse_sens_touchpad: 1.0,
            rgb: RgbConfig::default(),
            show_battery_led: true,
            player_led_brightness: LedBrightness::High,
            trigger_l2: AdaptiveTrigger::default(),
            trigger_r2: AdaptiveTrigger::default(),
        }
    }
}

impl Default for RgbConfig {
    fn default() -> Self {
        Self { r: 0, g: 100, b: 255, brightness: 255 }
    }
}

impl Default for LedBrightness {
    fn default() -> Self {
        LedBrightness::High
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = EngineConfig::default();
        assert_eq!(config.deadzone_left, 0.1);
        assert_eq!(config.rgb.g, 100);
        assert_eq!(config.player_led_brightness, LedBrightness::High);
    }

    #[test]
    fn deserialize_partial_toml() {
        let toml_str = r#"
            deadzone_left = 0.25

            [rgb]
            r = 100
            g = 100
            b = 100
            brightness = 100
        "#;
        let config: EngineConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.deadzone_left, 0.25);
        assert_eq!(config.rgb.r, 100);
        // Other fields should be defaults
        assert_eq!(config.deadzone_right, 0.1);
        assert!(config.show_battery_led);
    }
}
