/// Device Hider: toggles HID-instance visibility via the HidHide filter
/// driver, so only this process can open the physical controller while it's
/// bridged.
///
/// Grounded in style on the pack's `vigem-rust` example's
/// `internal::bus::Bus::connect` — open the driver's device object with
/// `CreateFileW`, talk to it with `DeviceIoControl`. HidHide exposes a fixed
/// symbolic link (`\\.\HidHide`) rather than a GUID-enumerated interface, so
/// no `SetupDiGetClassDevsW` enumeration step is needed here.

use crate::error::EngineError;
use std::ffi::c_void;
use windows::core::PCWSTR;
use windows::Win32::Foundation::{CloseHandle, HANDLE, INVALID_HANDLE_VALUE};
use windows::Win32::Storage::FileSystem::{
    CreateFileW, FILE_ATTRIBUTE_NORMAL, FILE_GENERIC_READ, FILE_GENERIC_WRITE, FILE_SHARE_READ,
    FILE_SHARE_WRITE, OPEN_EXISTING,
};
use windows::Win32::System::Ioctl::{FILE_ANY_ACCESS, FILE_DEVICE_UNKNOWN, METHOD_BUFFERED};
use windows::Win32::System::IO::DeviceIoControl;

const HIDHIDE_PATH: &str = r"\\.\HidHide";

const fn ctl_code(device_type: u32, function: u32, method: u32, access: u32) -> u32 {
    (device_type << 16) | (access << 14) | (function << 2) | method
}

// Function codes follow HidHide's published IOCTL interface numbering.
const IOCTL_GET_WHITELIST: u32 = ctl_code(FILE_DEVICE_UNKNOWN.0, 2048, METHOD_BUFFERED, FILE_ANY_ACCESS);
const IOCTL_SET_WHITELIST: u32 = ctl_code(FILE_DEVICE_UNKNOWN.0, 2049, METHOD_BUFFERED, FILE_ANY_ACCESS);
const IOCTL_GET_BLACKLIST: u32 = ctl_code(FILE_DEVICE_UNKNOWN.0, 2050, METHOD_BUFFERED, FILE_ANY_ACCESS);
const IOCTL_SET_BLACKLIST: u32 = ctl_code(FILE_DEVICE_UNKNOWN.0, 2051, METHOD_BUFFERED, FILE_ANY_ACCESS);

fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

struct DeviceHandle(HANDLE);

impl Drop for DeviceHandle {
    fn drop(&mut self) {
        unsafe {
            let _ = CloseHandle(self.0);
        }
    }
}

fn open_driver() -> Result<DeviceHandle, EngineError> {
    let path = to_wide(HIDHIDE_PATH);
    let handle = unsafe {
        CreateFileW(
            PCWSTR(path.as_ptr()),
            (FILE_GENERIC_READ | FILE_GENERIC_WRITE).0,
            FILE_SHARE_READ | FILE_SHARE_WRITE,
            None,
            OPEN_EXISTING,
            FILE_ATTRIBUTE_NORMAL,
            None,
        )
    }
    .map_err(|e| EngineError::HiderUnavailable(e.to_string()))?;

    if handle == INVALID_HANDLE_VALUE {
        return Err(EngineError::HiderUnavailable("driver not present".into()));
    }
    Ok(DeviceHandle(handle))
}

fn ioctl(handle: &DeviceHandle, code: u32, input: &[u8]) -> Result<(), EngineError> {
    let mut bytes_returned: u32 = 0;
    let ok = unsafe {
        DeviceIoControl(
            handle.0,
            code,
            Some(input.as_ptr() as *const c_void),
            input.len() as u32,
            None,
            0,
            Some(&mut bytes_returned),
            None,
        )
    };
    ok.map_err(|e| EngineError::HiderUnavailable(e.to_string()))
}

/// Registers the given HID instance paths so HidHide hides them from every
/// process except this one. The whitelist of "allowed" application paths
/// (this executable) is assumed to already be configured out-of-band by the
/// installer; this call only manages the hidden-device blacklist.
pub fn hide(instance_paths: &[String]) -> Result<(), EngineError> {
    let handle = open_driver()?;
    let joined = instance_paths.join("\0");
    let wide = to_wide(&joined);
    let bytes: &[u8] =
        unsafe { std::slice::from_raw_parts(wide.as_ptr() as *const u8, wide.len() * 2) };
    ioctl(&handle, IOCTL_SET_BLACKLIST, bytes)
}

/// Clears the hidden-device blacklist, restoring visibility to every
/// process. Called on disconnect and on `set_hide_controller(false)`.
pub fn unhide_all() -> Result<(), EngineError> {
    let handle = open_driver()?;
    ioctl(&handle, IOCTL_SET_BLACKLIST, &[])
}

/// Best-effort availability probe used by `trigger_driver_refresh`.
pub fn is_available() -> bool {
    open_driver().is_ok()
}

#[allow(dead_code)]
fn unused_whitelist_ioctls_reference() -> (u32, u32) {
    // Kept to document the read-side IOCTLs this driver also exposes, even
    // though this engine never reads the whitelist back.
    (IOCTL_GET_WHITELIST, IOCTL_GET_BLACKLIST)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ioctl_codes_are_distinct() {
        let codes = [
            IOCTL_GET_WHITELIST,
            IOCTL_SET_WHITELIST,
            IOCTL_GET_BLACKLIST,
            IOCTL_SET_BLACKLIST,
        ];
        for (i, a) in codes.iter().enumerate() {
            for (j, b) in codes.iter().enumerate() {
                if i != j {
                    assert_ne!(a, b);
                }
            }
        }
    }

    #[test]
    fn to_wide_is_null_terminated() {
        let w = to_wide("x");
        assert_eq!(w.last(), Some(&0));
    }
}
