/// HID device management: open controller, read input reports, write output reports.
///
/// Key patterns replicated here:
/// - Filter by VID/PID + usage page 0x01 / usage 0x05 (gamepad collection)
/// - Activate Bluetooth extended mode via feature report
/// - Non-blocking read with timeout
/// - Write errors are non-fatal (log and continue); read errors classify disconnect

use crate::controller::{self, ConnectionType, ControllerType, GAMEPAD_USAGE, GAMEPAD_USAGE_PAGE};
use crate::crc32;
use crate::error::EngineError;
use hidapi::{HidApi, HidDevice};
use std::sync::{Arc, Mutex};

/// Information about a discovered controller.
pub struct ControllerInfo {
    pub controller_type: ControllerType,
    pub connection_type: ConnectionType,
    pub path: String,
}

/// Find all supported controllers, sorted with USB devices first.
/// When a controller is connected via both USB and Bluetooth simultaneously,
/// USB will always appear first — callers can `.next()` to pick the preferred one.
pub fn find_all_controllers(api: &HidApi) -> Vec<ControllerInfo> {
    let mut usb = Vec::new();
    let mut bt = Vec::new();

    for dev in api.device_list() {
        if dev.usage_page() != GAMEPAD_USAGE_PAGE || dev.usage() != GAMEPAD_USAGE {
            continue;
        }

        if let Some(ct) = controller::identify(dev.vendor_id(), dev.product_id()) {
            let path = dev.path().to_string_lossy().to_string();
            let conn = controller::detect_connection(&path);
            log::info!(
                "Found {} ({}) at {}",
                ct,
                conn,
                &path[..path.len().min(60)]
            );
            let info = ControllerInfo {
                controller_type: ct,
                connection_type: conn,
                path,
            };
            match conn {
                ConnectionType::Usb => usb.push(info),
                ConnectionType::Bluetooth => bt.push(info),
            }
        }
    }

    usb.extend(bt);
    usb
}

/// Pick the preferred controller, if any: USB over Bluetooth.
pub fn find_controller(api: &HidApi) -> Option<ControllerInfo> {
    find_all_controllers(api).into_iter().next()
}

/// Open the controller device.
pub fn open_device(api: &HidApi, info: &ControllerInfo) -> Result<HidDevice, EngineError> {
    let cpath = std::ffi::CString::new(info.path.as_bytes()).map_err(|_| {
        EngineError::TransportOpenDenied(hidapi::HidError::HidApiError {
            message: "invalid device path".into(),
        })
    })?;
    let device = api
        .open_path(&cpath)
        .map_err(EngineError::TransportOpenDenied)?;
    device
        .set_blocking_mode(false)
        .map_err(EngineError::TransportOpenDenied)?;
    Ok(device)
}

/// Activate Bluetooth extended mode by reading the appropriate feature report.
/// DualSense: feature report 0x05
/// DS4: feature report 0x02
///
/// The device's own feature report reply carries a CRC-32 trailer (seed
/// 0xA3); a mismatch is logged but does not fail the handshake outright,
/// since some firmware revisions omit the trailer on this particular report.
pub fn activate_bt_extended_mode(device: &HidDevice, ct: ControllerType) -> Result<(), EngineError> {
    let report_id = if ct.is_dualsense() { 0x05 } else { 0x02 };
    let mut buf = [0u8; 64];
    buf[0] = report_id;
    match device.get_feature_report(&mut buf) {
        Ok(n) => {
            if n >= 8 && !crc32::validate(crc32::SEED_FEATURE, &buf[..n]) {
                log::debug!("feature report 0x{report_id:02X} CRC mismatch (non-fatal)");
            }
            log::info!("BT extended mode activated (feature report 0x{report_id:02X}, {n} bytes)");
            Ok(())
        }
        Err(e) => {
            log::warn!("failed to read feature report 0x{report_id:02X}: {e}");
            Err(EngineError::TransportOpenDenied(e))
        }
    }
}

/// Wrapper around HidDevice for thread-safe write access.
/// Reads happen on the dedicated HID thread; writes can come from other tasks.
pub struct HidHandle {
    device: Arc<Mutex<HidDevice>>,
}

impl HidHandle {
    pub fn new(device: HidDevice) -> Self {
        Self {
            device: Arc::new(Mutex::new(device)),
        }
    }

    /// Clone the handle for sharing across tasks.
    pub fn clone_handle(&self) -> Self {
        Self {
            device: Arc::clone(&self.device),
        }
    }

    /// Read an input report.
    /// Returns Ok(n) with bytes read (0 = no data available within the timeout).
    /// Returns Err(TransportReadFailed) if the device is disconnected; callers
    /// classify three consecutive such errors within 200ms as a hard disconnect.
    pub fn read(&self, buf: &mut [u8]) -> Result<usize, EngineError> {
        let dev = self.device.lock().unwrap();
        match dev.read_timeout(buf, 4) {
            Ok(n) => Ok(n),
            Err(e) => {
                let msg = format!("{e}");
                if msg.contains("1167") || msg.contains("not connected") {
                    Err(EngineError::TransportReadFailed(e))
                } else {
                    log::error!("HID read error: {e}");
                    Ok(0)
                }
            }
        }
    }

    /// Write an output report. Errors are logged but not propagated (non-fatal,
    /// per §7: a single bad write must not stop the engine).
    pub fn write(&self, report: &[u8]) -> bool {
        let dev = self.device.lock().unwrap();
        match dev.write(report) {
            Ok(_) => true,
            Err(e) => {
                log::debug!("HID write error (non-fatal): {e}");
                false
            }
        }
    }

    /// Write a feature report (used by the Link State Machine's handshake).
    pub fn write_feature(&self, report: &[u8]) -> Result<(), EngineError> {
        let dev = self.device.lock().unwrap();
        dev.send_feature_report(report)
            .map_err(EngineError::TransportWriteFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usb_sorts_before_bt() {
        let bt = ControllerInfo {
            controller_type: ControllerType::DualSense,
            connection_type: ConnectionType::Bluetooth,
            path: "bt_path".into(),
        };
        let usb = ControllerInfo {
            controller_type: ControllerType::DualSense,
            connection_type: ConnectionType::Usb,
            path: "usb_path".into(),
        };
        let mut usb_vec = vec![usb];
        let bt_vec = vec![bt];
        usb_vec.extend(bt_vec);
        assert_eq!(usb_vec[0].connection_type, ConnectionType::Usb);
        assert_eq!(usb_vec[1].connection_type, ConnectionType::Bluetooth);
    }

    #[test]
    fn single_bt_when_no_usb() {
        let bt = ControllerInfo {
            controller_type: ControllerType::DualSense,
            connection_type: ConnectionType::Bluetooth,
            path: "bt_path".into(),
        };
        let mut usb_vec: Vec<ControllerInfo> = Vec::new();
        let bt_vec = vec![bt];
        usb_vec.extend(bt_vec);
        assert_eq!(usb_vec.len(), 1);
        assert_eq!(usb_vec[0].connection_type, ConnectionType::Bluetooth);
    }
}
