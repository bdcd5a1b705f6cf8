use tokio_util::bytes::Bytes;
use tracing::warn;

pub const NAL_TYPE_SLICE: u8 = 1;
pub const NAL_TYPE_IDR: u8 = 5;
pub const NAL_TYPE_SEI: u8 = 6;
pub const NAL_TYPE_SPS: u8 = 7;
pub const NAL_TYPE_PPS: u8 = 8;
pub const NAL_TYPE_AUD: u8 = 9;
pub const NAL_TYPE_FILLER: u8 = 12;
pub const NAL_TYPE_STAP_A: u8 = 24;
pub const NAL_TYPE_FU_A: u8 = 28;

/// The nal_unit_type of the first byte of a nal unit, RFC 6184 5.2.
#[inline]
pub fn nal_unit_type(first_byte: u8) -> u8 {
    first_byte & 0x1F
}

/// VCL nal units carry coded slice data. Only these mark an access unit
/// boundary on the wire.
#[inline]
pub fn is_vcl(nal_type: u8) -> bool {
    (1..=5).contains(&nal_type)
}

/// @see: RFC 6184 5.8
/// ```text
/// +---------------+
/// |0|1|2|3|4|5|6|7|
/// +-+-+-+-+-+-+-+-+
/// |S|E|R|  Type   |
/// +---------------+
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FuHeader {
    pub start: bool,
    pub end: bool,
    pub nal_type: u8,
}

impl From<u8> for FuHeader {
    fn from(byte: u8) -> Self {
        Self {
            start: (byte & 0b1000_0000) != 0,
            end: (byte & 0b0100_0000) != 0,
            nal_type: byte & 0x1F,
        }
    }
}

impl From<FuHeader> for u8 {
    fn from(header: FuHeader) -> Self {
        let mut byte = header.nal_type & 0x1F;
        if header.start {
            byte |= 0b1000_0000;
        }
        if header.end {
            byte |= 0b0100_0000;
        }
        byte
    }
}

/// The FU indicator keeps the F and NRI bits of the fragmented nal unit
/// and replaces its type with FU-A.
#[inline]
pub fn fu_indicator(nal_header: u8) -> u8 {
    (nal_header & 0xE0) | NAL_TYPE_FU_A
}

/// Rebuilds the original nal unit header from an FU indicator and FU header.
#[inline]
pub fn reassembled_nal_header(indicator: u8, fu_header: u8) -> u8 {
    (fu_header & 0x1F) | (indicator & 0xE0)
}

/// Splits a STAP-A payload into its aggregated nal units. A length field
/// that overruns the packet ends the walk with a warning, keeping whatever
/// was read up to that point.
pub fn split_aggregation(payload: &Bytes) -> Vec<Bytes> {
    let mut units = Vec::new();
    let mut position = 1;
    while position + 1 < payload.len() {
        let size =
            u16::from_be_bytes([payload[position], payload[position + 1]]) as usize;
        let start = position + 2;
        if start + size > payload.len() {
            warn!(
                "aggregation unit of {} bytes overruns a packet of {} bytes",
                size,
                payload.len()
            );
            break;
        }
        units.push(payload.slice(start..start + size));
        position = start + size;
    }
    units
}

/// Splits a buffer on 4 byte annex b start codes. Some encoders pack
/// several parameter sets into a single fragmented unit this way, even
/// though the RFC disallows it.
pub fn split_annex_b(data: &[u8]) -> Vec<&[u8]> {
    let mut units = Vec::new();
    let mut last = 0;
    let mut index = 0;
    while index + 4 <= data.len() {
        if data[index..index + 4] == [0, 0, 0, 1] {
            if index > last {
                units.push(&data[last..index]);
            }
            index += 4;
            last = index;
        } else {
            index += 1;
        }
    }
    if last < data.len() {
        units.push(&data[last..]);
    }
    units
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fu_header_round_trip() {
        let header = FuHeader {
            start: true,
            end: false,
            nal_type: NAL_TYPE_IDR,
        };
        let byte: u8 = header.into();
        assert_eq!(byte, 0x85);
        assert_eq!(FuHeader::from(byte), header);
    }

    #[test]
    fn test_fu_indicator_keeps_nri() {
        // nal header 0x65: F = 0, NRI = 3, type = 5
        assert_eq!(fu_indicator(0x65), 0x7C);
        assert_eq!(reassembled_nal_header(0x7C, 0x45), 0x65);
    }

    #[test]
    fn test_split_aggregation() {
        // STAP-A carrying a 2 byte and a 3 byte nal unit
        let payload = Bytes::from_static(&[
            0x78, // STAP-A nal header
            0x00, 0x02, 0x67, 0x42, // first unit
            0x00, 0x03, 0x68, 0xCE, 0x06, // second unit
        ]);
        let units = split_aggregation(&payload);
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].as_ref(), &[0x67, 0x42]);
        assert_eq!(units[1].as_ref(), &[0x68, 0xCE, 0x06]);
    }

    #[test]
    fn test_split_aggregation_truncated() {
        // second length field claims more bytes than the packet holds
        let payload = Bytes::from_static(&[0x78, 0x00, 0x01, 0x67, 0x00, 0x09, 0x68]);
        let units = split_aggregation(&payload);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].as_ref(), &[0x67]);
    }

    #[test]
    fn test_nal_classification() {
        assert!(is_vcl(NAL_TYPE_IDR));
        assert!(!is_vcl(NAL_TYPE_SPS));
        assert_eq!(nal_unit_type(0x65), NAL_TYPE_IDR);
    }

    #[test]
    fn test_split_annex_b() {
        let glued = [
            0x00, 0x00, 0x00, 0x01, 0x67, 0x42, 0x00, 0x00, 0x00, 0x01, 0x68, 0xCE,
        ];
        let units = split_annex_b(&glued);
        assert_eq!(units, vec![&[0x67, 0x42][..], &[0x68, 0xCE][..]]);

        // no start codes at all leaves the buffer whole
        let plain = [0x68, 0xCE, 0x06];
        assert_eq!(split_annex_b(&plain), vec![&plain[..]]);
    }
}
