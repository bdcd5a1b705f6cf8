use itertools::Itertools;
use tokio_util::bytes::{BufMut, Bytes, BytesMut};
use tracing::warn;

use crate::{
    codec::{
        PayloadCodec, h264, h265,
        mpeg4_generic::{AuConfig, AuHeaderSection},
        vp8::{self, Vp8PayloadDescriptor},
    },
    errors::{RtpError, RtpResult},
    packet::RtpTrivialPacket,
    timestamp::RtpTimestampExtender,
};

/// Frames whose rounded frame number drifts further than this from the
/// emitted frame count resync the frame grid instead of sliding.
const FRAME_GRID_RESYNC: u64 = 32;

/// A decoded media frame leaving the depacketizer. Video payloads are
/// access units of four byte big endian length prefixed nal units, audio
/// payloads bare codec frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFrame {
    pub timestamp_ms: u64,
    pub time_offset: u64,
    pub keyframe: bool,
    pub payload: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackEvent {
    Frame(MediaFrame),
    /// The codec initialization record changed. Emitted once per distinct
    /// value, compared byte for byte.
    Init(Bytes),
}

/// Parameter set nal units picked up from the stream, stored without
/// their length prefixes. Empty means not seen yet.
#[derive(Debug, Default, Clone)]
pub struct ParameterSets {
    pub vps: Bytes,
    pub sps: Bytes,
    pub pps: Bytes,
}

/// Hook for codec level insight the transport layer does not have: frame
/// rates live inside the sequence parameter set and full initialization
/// records need codec specific parsing. Both default to unavailable.
pub trait CodecInspector {
    fn frame_rate(&self, codec: PayloadCodec, sps: &[u8]) -> Option<f64> {
        let _ = (codec, sps);
        None
    }

    fn init_record(&self, codec: PayloadCodec, sets: &ParameterSets) -> Option<Bytes> {
        let _ = (codec, sets);
        None
    }
}

/// Reassembles the RTP packets of one track back into media frames.
///
/// Packets are expected in sequence number order, gaps included; feed
/// them through a sorter first when the transport reorders. Every call
/// returns the events the packet completed, oldest first.
pub struct RtpDepacketizer {
    codec: PayloadCodec,
    clock_multiplier: f64,
    timestamps: RtpTimestampExtender,
    first_timestamp: Option<u64>,
    last_sequence_number: Option<u16>,
    fragment_buffer: Vec<u8>,
    vp8_frame: Vec<u8>,
    vp8_frame_timestamp: u64,
    vp8_has_keyframe: bool,
    parameter_sets: ParameterSets,
    init_record: Bytes,
    frame_rate: f64,
    frame_count: u64,
    samples_per_frame: u64,
    au_config: AuConfig,
    inspector: Option<Box<dyn CodecInspector>>,
}

impl RtpDepacketizer {
    pub fn new(codec: PayloadCodec, clock_rate: u32) -> Self {
        Self {
            codec,
            clock_multiplier: codec.clock_multiplier(clock_rate),
            timestamps: RtpTimestampExtender::default(),
            first_timestamp: None,
            last_sequence_number: None,
            fragment_buffer: Vec::new(),
            vp8_frame: Vec::new(),
            vp8_frame_timestamp: 0,
            vp8_has_keyframe: false,
            parameter_sets: ParameterSets::default(),
            init_record: Bytes::new(),
            frame_rate: 0.0,
            frame_count: 0,
            samples_per_frame: 1024,
            au_config: AuConfig::default(),
            inspector: None,
        }
    }

    /// Frame rate known from container metadata, used to snap video
    /// timestamps onto the frame grid.
    pub fn with_frame_rate(mut self, frame_rate: f64) -> Self {
        self.frame_rate = frame_rate;
        self
    }

    /// Samples per access unit for AAC tracks, 1024 when not set.
    pub fn with_samples_per_frame(mut self, samples_per_frame: u64) -> Self {
        self.samples_per_frame = samples_per_frame;
        self
    }

    pub fn with_inspector(mut self, inspector: Box<dyn CodecInspector>) -> Self {
        self.inspector = Some(inspector);
        self
    }

    pub fn parameter_sets(&self) -> &ParameterSets {
        &self.parameter_sets
    }

    pub fn init_record(&self) -> &Bytes {
        &self.init_record
    }

    /// Consumes one packet and returns whatever frames and init changes
    /// it completed.
    pub fn depacketize(&mut self, packet: &RtpTrivialPacket) -> RtpResult<Vec<TrackEvent>> {
        let extended = self.timestamps.extend(packet.header.timestamp);
        let first = *self.first_timestamp.get_or_insert(extended);
        // presentation order may step behind the first packet, track time
        // bottoms out at zero
        let timestamp_ms =
            (extended.saturating_sub(first) as f64 / self.clock_multiplier) as u64;
        let missed = self
            .last_sequence_number
            .is_some_and(|last| last.wrapping_add(1) != packet.header.sequence_number);
        self.last_sequence_number = Some(packet.header.sequence_number);

        let mut events = Vec::new();
        match self.codec {
            PayloadCodec::H264 => {
                self.handle_h264(&mut events, timestamp_ms, &packet.payload, missed)
            }
            PayloadCodec::H265 => {
                self.handle_h265(&mut events, timestamp_ms, &packet.payload, missed)?
            }
            PayloadCodec::Vp8 => self.handle_vp8(&mut events, timestamp_ms, &packet.payload, missed),
            PayloadCodec::Aac => self.handle_aac(&mut events, timestamp_ms, &packet.payload)?,
            PayloadCodec::Mpeg2 | PayloadCodec::Mp3 | PayloadCodec::Mp2 => {
                self.handle_mpeg(&mut events, timestamp_ms, &packet.payload)
            }
            PayloadCodec::Ac3 => {
                return Err(RtpError::UnsupportedCodec(PayloadCodec::Ac3.to_string()));
            }
            _ => events.push(TrackEvent::Frame(MediaFrame {
                timestamp_ms,
                time_offset: 0,
                keyframe: false,
                payload: packet.payload.clone(),
            })),
        }
        Ok(events)
    }

    fn handle_h264(
        &mut self,
        events: &mut Vec<TrackEvent>,
        timestamp_ms: u64,
        payload: &Bytes,
        missed: bool,
    ) {
        if payload.is_empty() {
            warn!("empty h264 payload ignored");
            return;
        }
        let nal_type = h264::nal_unit_type(payload[0]);
        match nal_type {
            0 => warn!("null h264 nal unit type ignored"),
            1..=23 => self.h264_unit(events, timestamp_ms, payload.as_ref()),
            h264::NAL_TYPE_STAP_A => {
                for unit in h264::split_aggregation(payload) {
                    self.h264_unit(events, timestamp_ms, unit.as_ref());
                }
            }
            h264::NAL_TYPE_FU_A => {
                if payload.len() < 2 {
                    warn!("h264 fragmentation unit without a header, dropping");
                    return;
                }
                let fu_header = h264::FuHeader::from(payload[1]);
                if self.fragment_buffer.is_empty() && !fu_header.start {
                    return;
                }
                if !self.fragment_buffer.is_empty() && (fu_header.start || missed) {
                    warn!(
                        "ending an unfinished h264 fragment of {} bytes",
                        self.fragment_buffer.len()
                    );
                    self.fragment_buffer.clear();
                    return;
                }
                if fu_header.start {
                    self.fragment_buffer
                        .push(h264::reassembled_nal_header(payload[0], payload[1]));
                }
                self.fragment_buffer.extend_from_slice(&payload[2..]);
                if fu_header.end {
                    let nal_unit = std::mem::take(&mut self.fragment_buffer);
                    match h264::nal_unit_type(nal_unit[0]) {
                        // some encoders glue several parameter sets into
                        // one fragmented unit with annex b start codes
                        h264::NAL_TYPE_SPS | h264::NAL_TYPE_PPS => {
                            for unit in h264::split_annex_b(&nal_unit) {
                                self.h264_unit(events, timestamp_ms, unit);
                            }
                        }
                        _ => self.h264_unit(events, timestamp_ms, &nal_unit),
                    }
                }
            }
            other => warn!("unsupported h264 packet type {}, ignoring", other),
        }
    }

    /// One complete h264 nal unit. Parameter sets update track state,
    /// everything else becomes a frame.
    fn h264_unit(&mut self, events: &mut Vec<TrackEvent>, timestamp_ms: u64, nal_unit: &[u8]) {
        if nal_unit.is_empty() {
            return;
        }
        let nal_type = h264::nal_unit_type(nal_unit[0]);
        if (nal_type == h264::NAL_TYPE_AUD && nal_unit.len() < 16) || nal_type == h264::NAL_TYPE_SEI
        {
            return;
        }
        match nal_type {
            h264::NAL_TYPE_SPS => {
                if self.parameter_sets.sps.as_ref() != nal_unit {
                    self.parameter_sets.sps = Bytes::copy_from_slice(nal_unit);
                    if let Some(inspector) = &self.inspector
                        && let Some(frame_rate) = inspector.frame_rate(self.codec, nal_unit)
                    {
                        self.frame_rate = frame_rate;
                    }
                    self.refresh_init(events);
                }
            }
            h264::NAL_TYPE_PPS => {
                if self.parameter_sets.pps.as_ref() != nal_unit {
                    self.parameter_sets.pps = Bytes::copy_from_slice(nal_unit);
                    self.refresh_init(events);
                }
            }
            _ => {
                let keyframe = nal_type == h264::NAL_TYPE_IDR;
                let mut data = Vec::with_capacity(4 + nal_unit.len());
                if keyframe {
                    // decoders joining at a keyframe get the parameter
                    // sets in band, even when still empty
                    for set in [&self.parameter_sets.sps, &self.parameter_sets.pps] {
                        data.extend_from_slice(&(set.len() as u32).to_be_bytes());
                        data.extend_from_slice(set);
                    }
                }
                data.extend_from_slice(&(nal_unit.len() as u32).to_be_bytes());
                data.extend_from_slice(nal_unit);
                self.emit_video(events, timestamp_ms, keyframe, data);
            }
        }
    }

    fn handle_h265(
        &mut self,
        events: &mut Vec<TrackEvent>,
        timestamp_ms: u64,
        payload: &Bytes,
        missed: bool,
    ) -> RtpResult<()> {
        if payload.len() < 2 {
            warn!("h265 payload of {} bytes ignored", payload.len());
            return Ok(());
        }
        let nal_type = h265::nal_unit_type(payload[0]);
        match nal_type {
            h265::NAL_TYPE_AP | h265::NAL_TYPE_PACI => {
                Err(RtpError::UnsupportedH265PacketType(nal_type))
            }
            h265::NAL_TYPE_FU => {
                if payload.len() < 3 {
                    warn!("h265 fragmentation unit without a header, dropping");
                    return Ok(());
                }
                let fu_header = h265::FuHeader::from(payload[2]);
                if self.fragment_buffer.is_empty() && !fu_header.start {
                    return Ok(());
                }
                if !self.fragment_buffer.is_empty() && (fu_header.start || missed) {
                    warn!(
                        "discarding an unfinished h265 fragment of {} bytes",
                        self.fragment_buffer.len()
                    );
                    self.fragment_buffer.clear();
                    return Ok(());
                }
                if fu_header.start {
                    self.fragment_buffer.extend_from_slice(&h265::reassembled_nal_header(
                        [payload[0], payload[1]],
                        payload[2],
                    ));
                }
                self.fragment_buffer.extend_from_slice(&payload[3..]);
                if fu_header.end {
                    let nal_unit = std::mem::take(&mut self.fragment_buffer);
                    self.h265_unit(events, timestamp_ms, &nal_unit);
                }
                Ok(())
            }
            _ => {
                self.h265_unit(events, timestamp_ms, payload.as_ref());
                Ok(())
            }
        }
    }

    fn h265_unit(&mut self, events: &mut Vec<TrackEvent>, timestamp_ms: u64, nal_unit: &[u8]) {
        if nal_unit.len() < 2 {
            return;
        }
        let nal_type = h265::nal_unit_type(nal_unit[0]);
        match nal_type {
            h265::NAL_TYPE_VPS | h265::NAL_TYPE_SPS | h265::NAL_TYPE_PPS => {
                let slot = match nal_type {
                    h265::NAL_TYPE_VPS => &mut self.parameter_sets.vps,
                    h265::NAL_TYPE_SPS => &mut self.parameter_sets.sps,
                    _ => &mut self.parameter_sets.pps,
                };
                if slot.as_ref() == nal_unit {
                    return;
                }
                *slot = Bytes::copy_from_slice(nal_unit);
                if nal_type == h265::NAL_TYPE_SPS
                    && let Some(inspector) = &self.inspector
                    && let Some(frame_rate) = inspector.frame_rate(self.codec, nal_unit)
                {
                    self.frame_rate = frame_rate;
                }
                self.refresh_init(events);
            }
            _ => {
                let mut data = Vec::with_capacity(4 + nal_unit.len());
                data.extend_from_slice(&(nal_unit.len() as u32).to_be_bytes());
                data.extend_from_slice(nal_unit);
                self.emit_video(events, timestamp_ms, h265::is_irap(nal_type), data);
            }
        }
    }

    fn handle_vp8(
        &mut self,
        events: &mut Vec<TrackEvent>,
        timestamp_ms: u64,
        payload: &Bytes,
        missed: bool,
    ) {
        if payload.len() < 3 {
            warn!("vp8 payload of {} bytes ignored", payload.len());
            return;
        }
        let Some(descriptor) = Vp8PayloadDescriptor::parse(payload) else {
            warn!("truncated vp8 payload descriptor, dropping");
            return;
        };
        if descriptor.bytes_count() > payload.len() {
            warn!("invalid vp8 payload descriptor, dropping");
            return;
        }
        let starts_frame = descriptor.starts_frame();
        let chunk = &payload[descriptor.bytes_count()..];

        if !self.vp8_frame.is_empty() {
            if starts_frame && !missed {
                let data = std::mem::take(&mut self.vp8_frame);
                events.push(TrackEvent::Frame(MediaFrame {
                    timestamp_ms: self.vp8_frame_timestamp,
                    time_offset: 0,
                    keyframe: self.vp8_has_keyframe,
                    payload: data.into(),
                }));
                self.frame_count += 1;
            }
            if starts_frame || missed {
                self.vp8_frame.clear();
                self.vp8_has_keyframe = false;
            }
        }
        if self.vp8_frame.is_empty() {
            if !starts_frame {
                warn!("vp8 chunk is not the start of a partition, dropping");
                return;
            }
            self.vp8_frame_timestamp = timestamp_ms;
        }
        self.vp8_frame.extend_from_slice(chunk);
        if starts_frame && chunk.first().is_some_and(|first| vp8::is_keyframe(*first)) {
            self.vp8_has_keyframe = true;
        }
    }

    fn handle_aac(
        &mut self,
        events: &mut Vec<TrackEvent>,
        timestamp_ms: u64,
        payload: &Bytes,
    ) -> RtpResult<()> {
        let section = AuHeaderSection::read_from(payload.as_ref(), &self.au_config)?;
        let header_bytes = section.bytes_count(&self.au_config);
        let mut offset = 0usize;
        let mut sample_offset = 0u64;
        for au_header in &section.au_headers {
            let start = header_bytes + offset;
            if start >= payload.len() {
                break;
            }
            let end = (start + au_header.au_size as usize).min(payload.len());
            events.push(TrackEvent::Frame(MediaFrame {
                timestamp_ms: timestamp_ms
                    + (sample_offset as f64 / self.clock_multiplier) as u64,
                time_offset: 0,
                keyframe: false,
                payload: payload.slice(start..end),
            }));
            offset += au_header.au_size as usize;
            sample_offset += self.samples_per_frame;
        }
        Ok(())
    }

    /// MPEG audio and video both carry a fixed four byte header before
    /// the elementary stream data.
    fn handle_mpeg(&mut self, events: &mut Vec<TrackEvent>, timestamp_ms: u64, payload: &Bytes) {
        if payload.len() < 5 {
            warn!("empty mpeg packet ignored");
            return;
        }
        events.push(TrackEvent::Frame(MediaFrame {
            timestamp_ms,
            time_offset: 0,
            keyframe: false,
            payload: payload.slice(4..),
        }));
    }

    fn emit_video(
        &mut self,
        events: &mut Vec<TrackEvent>,
        timestamp_ms: u64,
        keyframe: bool,
        data: Vec<u8>,
    ) {
        let (timestamp_ms, time_offset) = self.snap_to_frame_grid(timestamp_ms);
        events.push(TrackEvent::Frame(MediaFrame {
            timestamp_ms,
            time_offset,
            keyframe,
            payload: data.into(),
        }));
        self.frame_count += 1;
    }

    /// With a known frame rate, timestamps snap onto the grid of frames
    /// emitted so far and the remainder moves into the time offset. Jumps
    /// beyond the resync threshold restart the grid at the new position.
    fn snap_to_frame_grid(&mut self, timestamp_ms: u64) -> (u64, u64) {
        if self.frame_rate <= 1.0 {
            return (timestamp_ms, 0);
        }
        let frame_interval = 1000.0 / self.frame_rate;
        let frame_number = (timestamp_ms as f64 / frame_interval + 0.5) as u64;
        self.frame_count = self.frame_count.min(frame_number);
        if frame_number - self.frame_count > FRAME_GRID_RESYNC {
            self.frame_count = frame_number;
        }
        let time_offset = ((frame_number - self.frame_count) as f64 * frame_interval) as u64;
        ((self.frame_count as f64 * frame_interval) as u64, time_offset)
    }

    fn refresh_init(&mut self, events: &mut Vec<TrackEvent>) {
        let candidate = self
            .inspector
            .as_ref()
            .and_then(|inspector| inspector.init_record(self.codec, &self.parameter_sets))
            .or_else(|| match self.codec {
                PayloadCodec::H264 => default_h264_init(&self.parameter_sets),
                PayloadCodec::H265 => default_h265_init(&self.parameter_sets),
                _ => None,
            });
        if let Some(init) = candidate
            && init != self.init_record
        {
            self.init_record = init.clone();
            events.push(TrackEvent::Init(init));
        }
    }
}

/// An avcC decoder configuration record over the current parameter sets,
/// four byte nal unit lengths, one sps and one pps.
fn default_h264_init(sets: &ParameterSets) -> Option<Bytes> {
    if sets.sps.len() < 4 || sets.pps.is_empty() {
        return None;
    }
    let mut record = BytesMut::with_capacity(11 + sets.sps.len() + sets.pps.len());
    record.put_u8(1);
    record.put_u8(sets.sps[1]);
    record.put_u8(sets.sps[2]);
    record.put_u8(sets.sps[3]);
    record.put_u8(0xFF);
    record.put_u8(0xE1);
    record.put_u16(sets.sps.len() as u16);
    record.put_slice(&sets.sps);
    record.put_u8(1);
    record.put_u16(sets.pps.len() as u16);
    record.put_slice(&sets.pps);
    Some(record.freeze())
}

/// Length prefixed vps, sps and pps once all three are known. A proper
/// hvcC record needs sps parsing, which a [`CodecInspector`] can supply.
fn default_h265_init(sets: &ParameterSets) -> Option<Bytes> {
    if sets.vps.is_empty() || sets.sps.is_empty() || sets.pps.is_empty() {
        return None;
    }
    let record: Vec<u8> = [&sets.vps, &sets.sps, &sets.pps]
        .iter()
        .map(|set| {
            let mut unit = (set.len() as u32).to_be_bytes().to_vec();
            unit.extend_from_slice(set);
            unit
        })
        .concat();
    Some(record.into())
}
