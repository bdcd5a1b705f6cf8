use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RtpError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("rtp packet has no payload")]
    EmptyPayload,
    #[error("invalid padding size {0} for a packet of {1} bytes")]
    BadPaddingSize(usize, usize),
    #[error("too many csrc identifiers: {0}")]
    TooManyCSRC(usize),
    #[error("invalid mtu: {0}")]
    InvalidMTU(usize),
    #[error("unknown rtcp payload type: {0}")]
    UnknownRtcpPayloadType(u8),
    #[error("wrong rtcp payload type: {0}")]
    WrongPayloadType(String),
    #[error("too many report blocks: {0}")]
    TooManyReportBlocks(usize),
    #[error("unsupported h265 packet type: {0}")]
    UnsupportedH265PacketType(u8),
    #[error("access unit of {0} bytes does not fit a 13 bit AU-header size field")]
    OversizedAccessUnit(usize),
    #[error("unsupported codec: {0}")]
    UnsupportedCodec(String),
}

pub type RtpResult<T> = Result<T, RtpError>;
