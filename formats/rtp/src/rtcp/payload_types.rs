use crate::errors::RtpError;

/// Assigned RTCP packet types, RFC 3550 12.1.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RtcpPayloadType {
    SenderReport = 200,
    ReceiverReport = 201,
    SourceDescription = 202,
    Bye = 203,
    App = 204,
}

impl Default for RtcpPayloadType {
    fn default() -> Self {
        Self::SenderReport
    }
}

impl TryFrom<u8> for RtcpPayloadType {
    type Error = RtpError;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            200 => Ok(Self::SenderReport),
            201 => Ok(Self::ReceiverReport),
            202 => Ok(Self::SourceDescription),
            203 => Ok(Self::Bye),
            204 => Ok(Self::App),
            _ => Err(RtpError::UnknownRtcpPayloadType(value)),
        }
    }
}

impl From<RtcpPayloadType> for u8 {
    fn from(value: RtcpPayloadType) -> Self {
        value as u8
    }
}
