/// Virtual Pad Sink: submits `XboxPadState` frames to the ViGEmBus kernel
/// driver via the `vigem-client` crate.
///
/// API shape grounded on the pack's `vigem-rust` example (`Client`,
/// `TargetHandle`, builder-based plugin), adapted to the real crates.io
/// `vigem-client` crate rather than a path dependency on that example.
///
/// Plug is lazy: the first `submit()` after a connectivity gap replugs.
/// If the bus driver is unavailable, `submit()` degrades to a no-op and
/// flips a status flag rather than propagating a fatal error — RGB and
/// synthetic input must keep working without it.

use crate::error::EngineError;
use crate::xbox::XboxPadState;
use std::sync::mpsc::Receiver;
use vigem_client::{Client, TargetId, XButtons, XGamepad, Xbox360Wired};

pub struct VirtualPadSink {
    client: Option<Client>,
    target: Option<Xbox360Wired<Client>>,
    notifications: Option<Receiver<vigem_client::XGamepadNotification>>,
    available: bool,
}

impl VirtualPadSink {
    pub fn new() -> Self {
        Self { client: None, target: None, notifications: None, available: true }
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    fn ensure_plugged(&mut self) -> Result<(), EngineError> {
        if self.target.is_some() {
            return Ok(());
        }
        let client = match &self.client {
            Some(c) => c.clone(),
            None => {
                let c = Client::connect().map_err(|e| {
                    self.available = false;
                    EngineError::BusDriverUnavailable(e.to_string())
                })?;
                self.client = Some(c.clone());
                c
            }
        };
        let mut target = Xbox360Wired::new(client, TargetId::XBOX360_WIRED);
        target.plugin().map_err(|e| {
            self.available = false;
            EngineError::VirtualPadPlugFailed(e.to_string())
        })?;
        target.wait_ready().map_err(|e| {
            self.available = false;
            EngineError::VirtualPadPlugFailed(e.to_string())
        })?;
        self.notifications = target.request_notification().ok();
        self.available = true;
        self.target = Some(target);
        Ok(())
    }

    /// Drain any pending force-feedback notifications from the bus driver,
    /// returning the most recent (large_motor, small_motor) pair if a game
    /// has rumbled the pad since the last poll. Non-blocking.
    pub fn poll_rumble(&mut self) -> Option<(u8, u8)> {
        let rx = self.notifications.as_ref()?;
        let mut latest = None;
        while let Ok(n) = rx.try_recv() {
            latest = Some((n.large_motor, n.small_motor));
        }
        latest
    }

    /// Submit the current frame. Never fatal: failures degrade `available`
    /// and are logged once per transition, not once per frame.
    pub fn submit(&mut self, pad: &XboxPadState) {
        if self.ensure_plugged().is_err() {
            return;
        }
        let Some(target) = &mut self.target else { return };

        let mut gamepad = XGamepad::default();
        gamepad.buttons = XButtons(pad.buttons.bits());
        gamepad.left_trigger = pad.left_trigger;
        gamepad.right_trigger = pad.right_trigger;
        gamepad.thumb_lx = pad.thumb_lx;
        gamepad.thumb_ly = pad.thumb_ly;
        gamepad.thumb_rx = pad.thumb_rx;
        gamepad.thumb_ry = pad.thumb_ry;

        if target.update(&gamepad).is_err() {
            log::warn!("virtual pad update failed; will replug on next submit");
            self.target = None;
        }
    }

    /// Unplug on transport loss or shutdown; releases the bus slot.
    pub fn unplug(&mut self) {
        self.notifications = None;
        if let Some(mut target) = self.target.take() {
            let _ = target.unplug();
        }
    }
}

impl Drop for VirtualPadSink {
    fn drop(&mut self) {
        self.unplug();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_available_and_unplugged() {
        let sink = VirtualPadSink::new();
        assert!(sink.is_available());
        assert!(sink.target.is_none());
    }
}
