use std::io::{self, Cursor, Read};

use common_header::RtcpCommonHeader;
use payload_types::RtcpPayloadType;
use receiver_report::RtcpReceiverReport;
use sender_report::RtcpSenderReport;
use tokio_util::bytes::Buf;
use utils::traits::{
    dynamic_sized_packet::DynamicSizedPacket,
    reader::{ReadRemainingFrom, TryReadFrom, TryReadRemainingFrom},
    writer::WriteTo,
};

use crate::errors::RtpError;

pub mod common_header;
pub mod framed;
pub mod payload_types;
pub mod receiver_report;
pub mod report_block;
pub mod reporter;
pub mod sender_report;
pub mod simple_ntp;

pub trait RtcpPacketSizeTrait: DynamicSizedPacket {
    fn get_packet_bytes_count_without_padding(&self) -> usize;
    fn get_header(&self) -> RtcpCommonHeader;
}

/// The report packets this crate deals in. Source descriptions, byes and
/// application packets are recognized by their header but not parsed.
#[derive(Debug)]
pub enum RtcpPacket {
    SenderReport(RtcpSenderReport),
    ReceiverReport(RtcpReceiverReport),
}

impl DynamicSizedPacket for RtcpPacket {
    fn get_packet_bytes_count(&self) -> usize {
        match self {
            Self::SenderReport(packet) => packet.get_packet_bytes_count(),
            Self::ReceiverReport(packet) => packet.get_packet_bytes_count(),
        }
    }
}

impl<R: AsRef<[u8]>> TryReadFrom<R> for RtcpPacket {
    type Error = RtpError;
    fn try_read_from(reader: &mut Cursor<R>) -> Result<Option<Self>, Self::Error> {
        let Some(header) = RtcpCommonHeader::try_read_from(reader.by_ref())? else {
            return Ok(None);
        };
        Self::try_read_remaining_from(header, reader)
    }
}

impl<R: AsRef<[u8]>> TryReadRemainingFrom<RtcpCommonHeader, R> for RtcpPacket {
    type Error = RtpError;
    fn try_read_remaining_from(
        header: RtcpCommonHeader,
        reader: &mut Cursor<R>,
    ) -> Result<Option<Self>, Self::Error> {
        let bytes_remaining = (header.length as usize) * 4;
        if reader.remaining() < bytes_remaining {
            return Ok(None);
        }

        let mut remaining_bytes = vec![0u8; bytes_remaining];
        reader.read_exact(&mut remaining_bytes)?;

        if header.padding && !remaining_bytes.is_empty() {
            let padding_bytes = remaining_bytes[remaining_bytes.len() - 1] as usize;
            if padding_bytes == 0 || padding_bytes > remaining_bytes.len() {
                return Err(RtpError::BadPaddingSize(
                    padding_bytes,
                    remaining_bytes.len(),
                ));
            }
            remaining_bytes.truncate(remaining_bytes.len() - padding_bytes);
        }

        let cursor = Cursor::new(&remaining_bytes);

        match header.payload_type {
            RtcpPayloadType::SenderReport => Ok(Some(Self::SenderReport(
                RtcpSenderReport::read_remaining_from(header, cursor)?,
            ))),
            RtcpPayloadType::ReceiverReport => Ok(Some(Self::ReceiverReport(
                RtcpReceiverReport::read_remaining_from(header, cursor)?,
            ))),
            other => Err(RtpError::WrongPayloadType(format!(
                "no parser for rtcp payload type {:?}",
                other
            ))),
        }
    }
}

impl<W: io::Write> WriteTo<W> for RtcpPacket {
    type Error = RtpError;
    fn write_to(&self, writer: &mut W) -> Result<(), Self::Error> {
        match self {
            RtcpPacket::SenderReport(packet) => packet.write_to(writer),
            RtcpPacket::ReceiverReport(packet) => packet.write_to(writer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use utils::bytes::writable_to_bytes;

    #[test]
    fn test_demux_sender_report() {
        let report = RtcpSenderReport::builder()
            .ssrc(3)
            .rtp_timestamp(111)
            .build()
            .unwrap();
        let bytes = writable_to_bytes(&report).unwrap();

        let mut cursor = Cursor::new(&bytes);
        let packet = RtcpPacket::try_read_from(&mut cursor).unwrap().unwrap();
        match packet {
            RtcpPacket::SenderReport(parsed) => {
                assert_eq!(parsed.sender_ssrc, 3);
                assert_eq!(parsed.sender_info.rtp_timestamp, 111);
            }
            other => panic!("expected a sender report, got {:?}", other),
        }
    }

    #[test]
    fn test_demux_receiver_report() {
        let report = RtcpReceiverReport::builder().ssrc(4).build().unwrap();
        let bytes = writable_to_bytes(&report).unwrap();

        let mut cursor = Cursor::new(&bytes);
        let packet = RtcpPacket::try_read_from(&mut cursor).unwrap().unwrap();
        assert!(matches!(packet, RtcpPacket::ReceiverReport(_)));
    }

    #[test]
    fn test_demux_incomplete_packet() {
        let report = RtcpSenderReport::builder().ssrc(3).build().unwrap();
        let bytes = writable_to_bytes(&report).unwrap();

        let mut cursor = Cursor::new(&bytes[..bytes.len() - 1]);
        assert!(RtcpPacket::try_read_from(&mut cursor).unwrap().is_none());
    }

    #[test]
    fn test_demux_unhandled_type() {
        // a BYE packet header with an empty body
        let bytes: Vec<u8> = vec![0x80, 203, 0, 0];
        let mut cursor = Cursor::new(&bytes);
        assert!(matches!(
            RtcpPacket::try_read_from(&mut cursor),
            Err(RtpError::WrongPayloadType(_))
        ));
    }
}
