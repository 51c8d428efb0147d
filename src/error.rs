/// Typed engine errors. Variant names mirror the dotted error kinds used in
/// logs and UI status (`Transport.ReadFailed`, `BusDriver.Unavailable`, ...).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Transport.NotFound: no supported controller present")]
    TransportNotFound,

    #[error("Transport.OpenDenied: {0}")]
    TransportOpenDenied(#[source] hidapi::HidError),

    #[error("Transport.ReadTimeout")]
    TransportReadTimeout,

    #[error("Transport.ReadFailed: {0}")]
    TransportReadFailed(#[source] hidapi::HidError),

    #[error("Transport.WriteFailed: {0}")]
    TransportWriteFailed(#[source] hidapi::HidError),

    #[error("Protocol.UnknownReportId: 0x{0:02X}")]
    ProtocolUnknownReportId(u8),

    #[error("Protocol.CrcBadOnHandshake")]
    ProtocolCrcBadOnHandshake,

    #[error("BusDriver.Unavailable: {0}")]
    BusDriverUnavailable(String),

    #[error("Hider.Unavailable: {0}")]
    HiderUnavailable(String),

    #[error("VirtualPad.PlugFailed: {0}")]
    VirtualPadPlugFailed(String),

    #[error("Profile.NotFound: {0}")]
    ProfileNotFound(String),

    #[error("Profile.NameInvalid: {0}")]
    ProfileNameInvalid(String),

    #[error("Config.Io: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config.ParseFailed: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("Config.SerializeFailed: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotted_names_survive_display() {
        let e = EngineError::ProtocolUnknownReportId(0x7F);
        assert_eq!(e.to_string(), "Protocol.UnknownReportId: 0x7F");
    }

    #[test]
    fn profile_not_found_carries_name() {
        let e = EngineError::ProfileNotFound("Tmux".into());
        assert!(e.to_string().contains("Tmux"));
    }
}
