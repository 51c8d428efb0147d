/// Link State Machine: drives the Bluetooth "enhanced mode" handshake and
/// tracks the transport's current state for the rest of the engine.
///
/// States: Unopened -> Opened(Usb) -> Active
///      or Unopened -> Opened(BtSimple) -> Handshaking -> Opened(BtEnhanced) -> Active
/// Terminal: Disconnected, reached from any state on a read failure or a
/// user-requested reconnect.

use crate::controller::{ConnectionType, ControllerType};
use std::time::{Duration, Instant};

/// The transport tag that drives report offsets and output-report shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Usb,
    BluetoothSimple,
    BluetoothEnhanced,
    Disconnected,
}

impl Transport {
    /// True exactly when outbound reports require the CRC-32 trailer.
    pub fn needs_crc(self) -> bool {
        matches!(self, Transport::BluetoothEnhanced)
    }

    pub fn connection_type(self) -> Option<ConnectionType> {
        match self {
            Transport::Usb => Some(ConnectionType::Usb),
            Transport::BluetoothSimple | Transport::BluetoothEnhanced => {
                Some(ConnectionType::Bluetooth)
            }
            Transport::Disconnected => None,
        }
    }
}

const HANDSHAKE_TIMEOUT: Duration = Duration::from_millis(500);
const HANDSHAKE_MAX_ATTEMPTS: u32 = 2;

/// Drives a single physical connection from open through the handshake.
pub struct LinkStateMachine {
    transport: Transport,
    ct: ControllerType,
    handshake_attempts: u32,
    active: bool,
}

impl LinkStateMachine {
    pub fn new(ct: ControllerType, initial: ConnectionType) -> Self {
        let transport = match initial {
            ConnectionType::Usb => Transport::Usb,
            ConnectionType::Bluetooth => Transport::BluetoothSimple,
        };
        Self {
            transport,
            ct,
            handshake_attempts: 0,
            active: false,
        }
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    /// Whether another handshake attempt is still worth making. The actual
    /// feature-report I/O is done by the caller via
    /// `hid::activate_bt_extended_mode` (it needs the raw `HidDevice`, taken
    /// before the device is wrapped in a `HidHandle`); this only tracks the
    /// retry budget and transport applicability.
    pub fn should_attempt_handshake(&self) -> bool {
        self.transport == Transport::BluetoothSimple
            && self.handshake_attempts < HANDSHAKE_MAX_ATTEMPTS
    }

    pub fn record_handshake_attempt(&mut self) {
        self.handshake_attempts += 1;
    }

    /// Called whenever a frame with a given report id is observed. Advances
    /// Handshaking -> BluetoothEnhanced when the enhanced report id appears,
    /// and any state -> Active on the first successfully decoded frame.
    pub fn observe_report_id(&mut self, report_id: u8, decoded_ok: bool) {
        let enhanced_id = if self.ct.is_dualsense() { 0x31 } else { 0x11 };
        if self.transport == Transport::BluetoothSimple && report_id == enhanced_id {
            self.transport = Transport::BluetoothEnhanced;
        }
        if decoded_ok {
            self.active = true;
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn mark_disconnected(&mut self) {
        self.transport = Transport::Disconnected;
        self.active = false;
    }
}

/// A simple deadline helper used by the handshake's "wait for enhanced report
/// within 500ms" rule; kept free of the state machine so it stays a pure
/// function the supervisor's event loop can call on its own tick.
pub fn handshake_deadline() -> Instant {
    Instant::now() + HANDSHAKE_TIMEOUT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usb_starts_active_capable_without_handshake() {
        let lsm = LinkStateMachine::new(ControllerType::DualSense, ConnectionType::Usb);
        assert_eq!(lsm.transport(), Transport::Usb);
        assert!(!lsm.transport().needs_crc());
    }

    #[test]
    fn bt_starts_simple_and_needs_crc_only_once_enhanced() {
        let lsm = LinkStateMachine::new(ControllerType::DualSense, ConnectionType::Bluetooth);
        assert_eq!(lsm.transport(), Transport::BluetoothSimple);
        assert!(!lsm.transport().needs_crc());
    }

    #[test]
    fn observing_enhanced_report_id_promotes_transport() {
        let mut lsm = LinkStateMachine::new(ControllerType::DualSense, ConnectionType::Bluetooth);
        lsm.observe_report_id(0x01, true); // still simple-mode id
        assert_eq!(lsm.transport(), Transport::BluetoothSimple);
        lsm.observe_report_id(0x31, true); // DualSense enhanced id
        assert_eq!(lsm.transport(), Transport::BluetoothEnhanced);
        assert!(lsm.transport().needs_crc());
    }

    #[test]
    fn ds4_enhanced_id_differs_from_dualsense() {
        let mut lsm = LinkStateMachine::new(ControllerType::Ds4V2, ConnectionType::Bluetooth);
        lsm.observe_report_id(0x31, true); // wrong id for DS4
        assert_eq!(lsm.transport(), Transport::BluetoothSimple);
        lsm.observe_report_id(0x11, true); // DS4 enhanced id
        assert_eq!(lsm.transport(), Transport::BluetoothEnhanced);
    }

    #[test]
    fn first_decoded_frame_marks_active() {
        let mut lsm = LinkStateMachine::new(ControllerType::DualSense, ConnectionType::Usb);
        assert!(!lsm.is_active());
        lsm.observe_report_id(0x01, true);
        assert!(lsm.is_active());
    }

    #[test]
    fn disconnect_resets_active_and_transport() {
        let mut lsm = LinkStateMachine::new(ControllerType::DualSense, ConnectionType::Usb);
        lsm.observe_report_id(0x01, true);
        lsm.mark_disconnected();
        assert_eq!(lsm.transport(), Transport::Disconnected);
        assert!(!lsm.is_active());
    }
}
