use tracing::{error, warn};
use utils::random::{random_u16, random_u32};

use crate::{
    codec::{
        PayloadCodec, h264, h265, mpeg2,
        mpeg4_generic::{AuConfig, AuHeaderSection},
        vp8,
    },
    errors::{RtpError, RtpResult},
    packet::RtpTrivialPacket,
};

/// Room for a payload in an ethernet sized datagram: 1500 minus the IP
/// and UDP headers.
pub const DEFAULT_MAX_PACKET_SIZE: usize = 1472;

/// Largest chunk of a VP8 frame sent in one packet.
pub const VP8_CHUNK_SIZE: usize = 1200;

const RTP_HEADER_BYTES: usize = 12;

/// Splits encoded frames into RTP packets for one outgoing track.
///
/// Video access units arrive as four byte big endian length prefixed nal
/// units and leave as single nal, FU-A (H264) or FU (H265) packets. VP8
/// frames are chunked with a minimal payload descriptor, MPEG2 frames get
/// the RFC 2250 video header, audio frames the payload header their
/// format asks for.
#[derive(Debug)]
pub struct RtpPacketizer {
    codec: PayloadCodec,
    payload_type: u8,
    ssrc: u32,
    sequence_number: u16,
    base_timestamp: u32,
    clock_multiplier: f64,
    max_packet_size: usize,
    sent_packets: u32,
    sent_bytes: u32,
    video_header: mpeg2::Mpeg2VideoHeader,
    au_config: AuConfig,
}

impl RtpPacketizer {
    pub fn new(codec: PayloadCodec, payload_type: u8, clock_rate: u32) -> Self {
        Self {
            codec,
            payload_type,
            ssrc: random_u32(),
            sequence_number: random_u16(),
            base_timestamp: random_u32(),
            clock_multiplier: codec.clock_multiplier(clock_rate),
            max_packet_size: DEFAULT_MAX_PACKET_SIZE,
            sent_packets: 0,
            sent_bytes: 0,
            video_header: mpeg2::Mpeg2VideoHeader::default(),
            au_config: AuConfig::default(),
        }
    }

    pub fn with_ssrc(mut self, ssrc: u32) -> Self {
        self.ssrc = ssrc;
        self
    }

    pub fn with_sequence_number(mut self, sequence_number: u16) -> Self {
        self.sequence_number = sequence_number;
        self
    }

    pub fn with_base_timestamp(mut self, base_timestamp: u32) -> Self {
        self.base_timestamp = base_timestamp;
        self
    }

    pub fn with_max_packet_size(mut self, max_packet_size: usize) -> Self {
        self.max_packet_size = max_packet_size;
        self
    }

    pub fn ssrc(&self) -> u32 {
        self.ssrc
    }

    pub fn sent_packets(&self) -> u32 {
        self.sent_packets
    }

    pub fn sent_bytes(&self) -> u32 {
        self.sent_bytes
    }

    /// Maps a track time in milliseconds onto this track's RTP clock.
    pub fn rtp_timestamp(&self, timestamp_ms: u64) -> u32 {
        self.base_timestamp
            .wrapping_add(((timestamp_ms as f64 * self.clock_multiplier) as u64) as u32)
    }

    /// Packetizes one frame, timestamped in milliseconds of track time.
    /// Video payloads are whole access units of length prefixed nal units,
    /// everything else is a single frame of codec data.
    pub fn packetize(
        &mut self,
        timestamp_ms: u64,
        payload: &[u8],
    ) -> RtpResult<Vec<RtpTrivialPacket>> {
        let timestamp = self.rtp_timestamp(timestamp_ms);
        let mut packets = Vec::new();
        match self.codec {
            PayloadCodec::H264 | PayloadCodec::H265 => {
                self.packetize_nal_units(&mut packets, timestamp, payload)?
            }
            PayloadCodec::Vp8 => self.packetize_vp8(&mut packets, timestamp, payload),
            PayloadCodec::Mpeg2 => self.packetize_mpeg2(&mut packets, timestamp, payload),
            _ => self.packetize_audio(&mut packets, timestamp, payload)?,
        }
        Ok(packets)
    }

    fn packetize_nal_units(
        &mut self,
        packets: &mut Vec<RtpTrivialPacket>,
        timestamp: u32,
        payload: &[u8],
    ) -> RtpResult<()> {
        let mut sent = 0;
        while sent + 4 <= payload.len() {
            let size = u32::from_be_bytes([
                payload[sent],
                payload[sent + 1],
                payload[sent + 2],
                payload[sent + 3],
            ]) as usize;
            let start = sent + 4;
            if size == 0 || start + size > payload.len() {
                warn!(
                    "nal unit of {} bytes overruns an access unit of {} bytes",
                    size,
                    payload.len()
                );
                break;
            }
            let last_of_access_unit = start + size >= payload.len();
            let nal_unit = &payload[start..start + size];
            match self.codec {
                PayloadCodec::H265 => {
                    self.send_h265(packets, timestamp, nal_unit, last_of_access_unit)?
                }
                _ => self.send_h264(packets, timestamp, nal_unit, last_of_access_unit)?,
            }
            sent = start + size;
        }
        Ok(())
    }

    fn send_h264(
        &mut self,
        packets: &mut Vec<RtpTrivialPacket>,
        timestamp: u32,
        nal_unit: &[u8],
        last_of_access_unit: bool,
    ) -> RtpResult<()> {
        let nal_type = h264::nal_unit_type(nal_unit[0]);
        if nal_type == h264::NAL_TYPE_FILLER {
            return Ok(());
        }
        let marker = last_of_access_unit && h264::is_vcl(nal_type);
        if RTP_HEADER_BYTES + nal_unit.len() <= self.max_packet_size {
            self.emit(packets, timestamp, marker, nal_unit);
            return Ok(());
        }

        let chunk_size = self.max_packet_size.saturating_sub(RTP_HEADER_BYTES + 2);
        if chunk_size == 0 {
            return Err(RtpError::InvalidMTU(self.max_packet_size));
        }
        let data = &nal_unit[1..];
        let mut offset = 0;
        while offset < data.len() {
            let take = chunk_size.min(data.len() - offset);
            let fu_header = h264::FuHeader {
                start: offset == 0,
                end: offset + take == data.len(),
                nal_type,
            };
            let mut fragment = Vec::with_capacity(2 + take);
            fragment.push(h264::fu_indicator(nal_unit[0]));
            fragment.push(fu_header.into());
            fragment.extend_from_slice(&data[offset..offset + take]);
            self.emit(packets, timestamp, fu_header.end && marker, &fragment);
            offset += take;
        }
        Ok(())
    }

    fn send_h265(
        &mut self,
        packets: &mut Vec<RtpTrivialPacket>,
        timestamp: u32,
        nal_unit: &[u8],
        last_of_access_unit: bool,
    ) -> RtpResult<()> {
        if nal_unit.len() < 2 {
            return Ok(());
        }
        if RTP_HEADER_BYTES + nal_unit.len() <= self.max_packet_size {
            self.emit(packets, timestamp, last_of_access_unit, nal_unit);
            return Ok(());
        }

        let chunk_size = self.max_packet_size.saturating_sub(RTP_HEADER_BYTES + 3);
        if chunk_size == 0 {
            return Err(RtpError::InvalidMTU(self.max_packet_size));
        }
        let payload_header = h265::fu_payload_header([nal_unit[0], nal_unit[1]]);
        let nal_type = h265::nal_unit_type(nal_unit[0]);
        let data = &nal_unit[2..];
        let mut offset = 0;
        while offset < data.len() {
            let take = chunk_size.min(data.len() - offset);
            let fu_header = h265::FuHeader {
                start: offset == 0,
                end: offset + take == data.len(),
                nal_type,
            };
            let mut fragment = Vec::with_capacity(3 + take);
            fragment.extend_from_slice(&payload_header);
            fragment.push(fu_header.into());
            fragment.extend_from_slice(&data[offset..offset + take]);
            self.emit(
                packets,
                timestamp,
                fu_header.end && last_of_access_unit,
                &fragment,
            );
            offset += take;
        }
        Ok(())
    }

    fn packetize_vp8(
        &mut self,
        packets: &mut Vec<RtpTrivialPacket>,
        timestamp: u32,
        payload: &[u8],
    ) {
        if payload.is_empty() {
            return;
        }
        let keyframe = vp8::is_keyframe(payload[0]);
        let chunk_size = VP8_CHUNK_SIZE
            .min(self.max_packet_size.saturating_sub(RTP_HEADER_BYTES + 1))
            .max(1);
        let mut offset = 0;
        while offset < payload.len() {
            let take = chunk_size.min(payload.len() - offset);
            let mut chunk = Vec::with_capacity(1 + take);
            chunk.push(vp8::descriptor_byte(offset == 0, keyframe));
            chunk.extend_from_slice(&payload[offset..offset + take]);
            offset += take;
            self.emit(packets, timestamp, offset == payload.len(), &chunk);
        }
    }

    fn packetize_mpeg2(
        &mut self,
        packets: &mut Vec<RtpTrivialPacket>,
        timestamp: u32,
        payload: &[u8],
    ) {
        let chunk_size = self
            .max_packet_size
            .saturating_sub(RTP_HEADER_BYTES + mpeg2::VIDEO_HEADER_BYTES)
            .max(1);
        let mut offset = 0;
        while offset < payload.len() {
            let take = chunk_size.min(payload.len() - offset);
            self.video_header.next_chunk();
            self.video_header.scan(&payload[offset..offset + take]);
            self.video_header.begin_slice = offset == 0;
            self.video_header.end_slice = offset + take == payload.len();

            let mut chunk = Vec::with_capacity(mpeg2::VIDEO_HEADER_BYTES + take);
            chunk.extend_from_slice(&self.video_header.to_bytes());
            chunk.extend_from_slice(&payload[offset..offset + take]);
            self.emit(packets, timestamp, self.video_header.end_slice, &chunk);
            offset += take;
        }
    }

    fn packetize_audio(
        &mut self,
        packets: &mut Vec<RtpTrivialPacket>,
        timestamp: u32,
        payload: &[u8],
    ) -> RtpResult<()> {
        let mut data = Vec::with_capacity(4 + payload.len());
        match self.codec {
            PayloadCodec::Aac => {
                if payload.len() as u64 > self.au_config.max_au_size() {
                    return Err(RtpError::OversizedAccessUnit(payload.len()));
                }
                AuHeaderSection::single(payload.len() as u64)
                    .write_to(&mut data, &self.au_config)?;
            }
            PayloadCodec::Mp3 | PayloadCodec::Mp2 => {
                if payload.first().is_some_and(|first| *first != 0xFF) {
                    error!("MPEG audio frame does not start at a sync word");
                }
                // RFC 2250 audio header, no fragmentation offset
                data.extend_from_slice(&[0, 0, 0, 0]);
            }
            PayloadCodec::Ac3 => {
                // RFC 4184 payload header, one complete frame
                data.extend_from_slice(&[0x00, 0x01]);
            }
            _ => {}
        }
        data.extend_from_slice(payload);
        // audio frames never split, an oversized one grows the datagram
        self.emit(packets, timestamp, true, &data);
        Ok(())
    }

    fn emit(
        &mut self,
        packets: &mut Vec<RtpTrivialPacket>,
        timestamp: u32,
        marker: bool,
        payload: &[u8],
    ) {
        let packet = RtpTrivialPacket::builder()
            .marker(marker)
            .payload_type(self.payload_type)
            .sequence_number(self.sequence_number)
            .timestamp(timestamp)
            .ssrc(self.ssrc)
            .payload(payload)
            .build();
        self.sequence_number = self.sequence_number.wrapping_add(1);
        self.sent_packets = self.sent_packets.wrapping_add(1);
        self.sent_bytes = self.sent_bytes.wrapping_add(payload.len() as u32);
        packets.push(packet);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packetizer(codec: PayloadCodec) -> RtpPacketizer {
        RtpPacketizer::new(codec, 96, 90_000)
            .with_ssrc(0x1234_5678)
            .with_sequence_number(100)
            .with_base_timestamp(1_000)
    }

    fn length_prefixed(nal_units: &[&[u8]]) -> Vec<u8> {
        let mut out = Vec::new();
        for unit in nal_units {
            out.extend_from_slice(&(unit.len() as u32).to_be_bytes());
            out.extend_from_slice(unit);
        }
        out
    }

    #[test]
    fn test_h264_single_nal() {
        let mut packetizer = packetizer(PayloadCodec::H264);
        let nal = [0x65, 1, 2, 3, 4];
        let packets = packetizer.packetize(10, &length_prefixed(&[&nal])).unwrap();
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].payload.as_ref(), &nal);
        assert!(packets[0].header.marker);
        assert_eq!(packets[0].header.sequence_number, 100);
        assert_eq!(packets[0].header.timestamp, 1_000 + 900);
        assert_eq!(packets[0].header.ssrc, 0x1234_5678);
        assert_eq!(packetizer.sent_packets(), 1);
        assert_eq!(packetizer.sent_bytes(), 5);
    }

    #[test]
    fn test_h264_non_vcl_has_no_marker() {
        let mut packetizer = packetizer(PayloadCodec::H264);
        let packets = packetizer
            .packetize(0, &length_prefixed(&[&[0x67, 0x42, 0x00]]))
            .unwrap();
        assert_eq!(packets.len(), 1);
        assert!(!packets[0].header.marker);
    }

    #[test]
    fn test_h264_marker_only_on_last_nal() {
        let mut packetizer = packetizer(PayloadCodec::H264);
        let packets = packetizer
            .packetize(0, &length_prefixed(&[&[0x67, 1], &[0x68, 2], &[0x65, 3, 4]]))
            .unwrap();
        assert_eq!(packets.len(), 3);
        assert!(!packets[0].header.marker);
        assert!(!packets[1].header.marker);
        assert!(packets[2].header.marker);
        assert_eq!(packets[2].header.sequence_number, 102);
    }

    #[test]
    fn test_h264_filler_skipped() {
        let mut packetizer = packetizer(PayloadCodec::H264);
        let packets = packetizer
            .packetize(0, &length_prefixed(&[&[0x0C, 0, 0, 0]]))
            .unwrap();
        assert!(packets.is_empty());
        assert_eq!(packetizer.sent_packets(), 0);
    }

    #[test]
    fn test_h264_fragmentation_round_trip() {
        let mut packetizer = packetizer(PayloadCodec::H264).with_max_packet_size(30);
        let mut nal = vec![0x65];
        nal.extend((0..50).map(|byte| byte as u8));
        let packets = packetizer.packetize(0, &length_prefixed(&[&nal])).unwrap();
        // 16 byte fragments of a 50 byte body
        assert_eq!(packets.len(), 4);

        let mut reassembled = Vec::new();
        for (index, packet) in packets.iter().enumerate() {
            let payload = packet.payload.as_ref();
            assert_eq!(h264::nal_unit_type(payload[0]), h264::NAL_TYPE_FU_A);
            let fu_header = h264::FuHeader::from(payload[1]);
            assert_eq!(fu_header.start, index == 0);
            assert_eq!(fu_header.end, index == packets.len() - 1);
            assert_eq!(packet.header.marker, fu_header.end);
            if fu_header.start {
                reassembled.push(h264::reassembled_nal_header(payload[0], payload[1]));
            }
            reassembled.extend_from_slice(&payload[2..]);
        }
        assert_eq!(reassembled, nal);
    }

    #[test]
    fn test_h264_mtu_too_small() {
        let mut packetizer = packetizer(PayloadCodec::H264).with_max_packet_size(14);
        let nal = [0x65; 40];
        assert!(matches!(
            packetizer.packetize(0, &length_prefixed(&[&nal])),
            Err(RtpError::InvalidMTU(14))
        ));
    }

    #[test]
    fn test_h265_fragmentation_round_trip() {
        let mut packetizer = packetizer(PayloadCodec::H265).with_max_packet_size(30);
        let mut nal = vec![0x26, 0x01];
        nal.extend((0..40).map(|byte| byte as u8));
        let packets = packetizer.packetize(0, &length_prefixed(&[&nal])).unwrap();
        assert!(packets.len() > 1);

        let mut reassembled = Vec::new();
        for (index, packet) in packets.iter().enumerate() {
            let payload = packet.payload.as_ref();
            assert_eq!(h265::nal_unit_type(payload[0]), h265::NAL_TYPE_FU);
            let fu_header = h265::FuHeader::from(payload[2]);
            assert_eq!(fu_header.start, index == 0);
            assert_eq!(fu_header.end, index == packets.len() - 1);
            if fu_header.start {
                reassembled.extend_from_slice(&h265::reassembled_nal_header(
                    [payload[0], payload[1]],
                    payload[2],
                ));
            }
            reassembled.extend_from_slice(&payload[3..]);
        }
        assert_eq!(reassembled, nal);
    }

    #[test]
    fn test_vp8_chunking() {
        let mut packetizer = packetizer(PayloadCodec::Vp8);
        let mut frame = vec![0x50]; // keyframe bit clear
        frame.extend(std::iter::repeat_n(0xAB, 2_499));
        let packets = packetizer.packetize(0, &frame).unwrap();
        assert_eq!(packets.len(), 3);
        assert_eq!(packets[0].payload[0], 0x10);
        assert_eq!(packets[1].payload[0], 0x00);
        assert_eq!(packets[2].payload[0], 0x00);
        assert!(!packets[0].header.marker);
        assert!(packets[2].header.marker);
        assert_eq!(packets[0].payload.len(), 1201);
        assert_eq!(packets[2].payload.len(), 101);
    }

    #[test]
    fn test_vp8_droppable_frame() {
        let mut packetizer = packetizer(PayloadCodec::Vp8);
        let packets = packetizer.packetize(0, &[0x51, 1, 2, 3]).unwrap();
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].payload[0], 0x30);
        assert!(packets[0].header.marker);
    }

    #[test]
    fn test_mpeg2_single_packet() {
        let mut packetizer = packetizer(PayloadCodec::Mpeg2).with_ssrc(1);
        // sequence header then a picture header, temporal reference 1
        let mut frame = vec![0x00, 0x00, 0x01, 0xB3, 0x2C, 0x02, 0x40];
        frame.extend_from_slice(&[0x00, 0x00, 0x01, 0x00, 0x00, 0x48, 0xFF, 0xFF]);
        let packets = packetizer.packetize(0, &frame).unwrap();
        assert_eq!(packets.len(), 1);
        let payload = packets[0].payload.as_ref();
        // temporal reference 1, S|B|E flags, coding type 1
        assert_eq!(&payload[..4], &[0x00, 0x01, 0x39, 0x00]);
        assert_eq!(&payload[4..], &frame[..]);
        assert!(packets[0].header.marker);
    }

    #[test]
    fn test_mpeg2_fragmented_flags() {
        let mut packetizer = packetizer(PayloadCodec::Mpeg2).with_max_packet_size(26);
        let mut frame = vec![0x00, 0x00, 0x01, 0x00, 0x00, 0x48];
        frame.extend(std::iter::repeat_n(0u8, 20));
        let packets = packetizer.packetize(0, &frame).unwrap();
        assert!(packets.len() > 1);
        let first = packets[0].payload.as_ref();
        let last = packets[packets.len() - 1].payload.as_ref();
        assert_eq!(first[2] & 0x10, 0x10);
        assert_eq!(first[2] & 0x08, 0x00);
        assert!(!packets[0].header.marker);
        assert_eq!(last[2] & 0x08, 0x08);
        assert!(packets[packets.len() - 1].header.marker);
        // picture fields from the first chunk stick to later chunks
        assert_eq!(last[1], 0x01);
    }

    #[test]
    fn test_aac_au_header() {
        let mut packetizer = packetizer(PayloadCodec::Aac);
        let payload = [0xAB; 100];
        let packets = packetizer.packetize(0, &payload).unwrap();
        assert_eq!(packets.len(), 1);
        assert!(packets[0].header.marker);
        assert_eq!(&packets[0].payload[..4], &[0x00, 0x10, 0x03, 0x20]);
        assert_eq!(&packets[0].payload[4..], &payload);
    }

    #[test]
    fn test_aac_oversized_access_unit() {
        let mut packetizer = packetizer(PayloadCodec::Aac);
        let payload = vec![0u8; 9_000];
        assert!(matches!(
            packetizer.packetize(0, &payload),
            Err(RtpError::OversizedAccessUnit(9_000))
        ));
    }

    #[test]
    fn test_mpeg_audio_header() {
        let mut packetizer = packetizer(PayloadCodec::Mp3);
        let packets = packetizer.packetize(0, &[0xFF, 0xFB, 0x90, 0x00]).unwrap();
        assert_eq!(packets.len(), 1);
        assert_eq!(&packets[0].payload[..4], &[0, 0, 0, 0]);
        assert_eq!(&packets[0].payload[4..], &[0xFF, 0xFB, 0x90, 0x00]);
    }

    #[test]
    fn test_ac3_header() {
        let mut packetizer = packetizer(PayloadCodec::Ac3);
        let packets = packetizer.packetize(0, &[0x0B, 0x77, 0x10]).unwrap();
        assert_eq!(&packets[0].payload[..2], &[0x00, 0x01]);
    }

    #[test]
    fn test_raw_audio_passthrough() {
        let mut packetizer = RtpPacketizer::new(PayloadCodec::Ulaw, 0, 8_000)
            .with_base_timestamp(0)
            .with_sequence_number(0);
        let packets = packetizer.packetize(20, &[1, 2, 3, 4]).unwrap();
        assert_eq!(packets[0].payload.as_ref(), &[1, 2, 3, 4]);
        assert_eq!(packets[0].header.timestamp, 160);
        assert!(packets[0].header.marker);
    }
}
