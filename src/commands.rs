/// Commands the UI layer sends to the supervisor, and the state snapshots
/// it gets back. Carried over `tokio::sync::mpsc`/`watch` channels rather
/// than a wire protocol — there is no separate UI process in this crate,
/// only the channel boundary the supervisor owns.

use crate::config::LedBrightness;
use crate::mapping::MappingSet;
use crate::output::TriggerMode;
use serde::{Deserialize, Serialize};

/// A command issued by the UI layer to the running supervisor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EngineCommand {
    GetInitialState,
    UpdateMappings(MappingSet),
    SetRgb { r: u8, g: u8, b: u8 },
    SetPlayerLedBrightness(LedBrightness),
    SetShowBatteryLed(bool),
    SetDeadzones { left: f32, right: f32 },
    SetMouseSens { left: f32, right: f32 },
    SetTouchpadSens(f32),
    SetTriggerL2 { mode: TriggerMode, start: u8, force: u8 },
    SetTriggerR2 { mode: TriggerMode, start: u8, force: u8 },
    SetHideController(bool),
    SaveProfile(String),
    LoadProfile(String),
    DeleteProfile(String),
    GetProfiles,
    DisconnectController,
    TriggerDriverRefresh,
}

/// Connection/battery/profile summary the UI can render, pushed on every
/// state change and in response to `GetInitialState`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStateSnapshot {
    pub connected: bool,
    pub transport: String,
    pub battery_percent: u8,
    pub is_charging: bool,
    pub current_profile: String,
    pub virtual_pad_available: bool,
    pub hider_available: bool,
}

/// Response to `GetProfiles`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileList {
    pub names: Vec<String>,
    pub current: String,
}

/// Everything the supervisor can push back to the UI, unprompted or in
/// reply to a command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EngineEvent {
    State(EngineStateSnapshot),
    Profiles(ProfileList),
    Error(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_round_trip_through_json() {
        let cmd = EngineCommand::SetRgb { r: 1, g: 2, b: 3 };
        let s = serde_json::to_string(&cmd).unwrap();
        let back: EngineCommand = serde_json::from_str(&s).unwrap();
        match back {
            EngineCommand::SetRgb { r, g, b } => assert_eq!((r, g, b), (1, 2, 3)),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn snapshot_serializes_with_expected_fields() {
        let snap = EngineStateSnapshot {
            connected: true,
            transport: "Usb".into(),
            battery_percent: 87,
            is_charging: false,
            current_profile: "Default".into(),
            virtual_pad_available: true,
            hider_available: false,
        };
        let v = serde_json::to_value(&snap).unwrap();
        assert_eq!(v["battery_percent"], 87);
    }
}
