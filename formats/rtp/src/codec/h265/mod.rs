pub const NAL_TYPE_VPS: u8 = 32;
pub const NAL_TYPE_SPS: u8 = 33;
pub const NAL_TYPE_PPS: u8 = 34;
pub const NAL_TYPE_AP: u8 = 48;
pub const NAL_TYPE_FU: u8 = 49;
pub const NAL_TYPE_PACI: u8 = 50;

/// The nal_unit_type of a two byte H265 nal unit header, RFC 7798 1.1.4.
#[inline]
pub fn nal_unit_type(first_byte: u8) -> u8 {
    (first_byte & 0x7E) >> 1
}

/// IRAP pictures (BLA, IDR and CRA) start a new coded video sequence.
#[inline]
pub fn is_irap(nal_type: u8) -> bool {
    (16..=21).contains(&nal_type)
}

/// @see: RFC 7798 4.4.3
/// ```text
/// +---------------+
/// |0|1|2|3|4|5|6|7|
/// +-+-+-+-+-+-+-+-+
/// |S|E|  FuType   |
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
            nal_type: byte & 0x3F,
        }
    }
}

impl From<FuHeader> for u8 {
    fn from(header: FuHeader) -> Self {
        let mut byte = header.nal_type & 0x3F;
        if header.start {
            byte |= 0b1000_0000;
        }
        if header.end {
            byte |= 0b0100_0000;
        }
        byte
    }
}

/// The two byte payload header of an FU packet keeps the F bit and layer
/// and temporal id fields of the fragmented nal unit, with the type field
/// set to FU.
#[inline]
pub fn fu_payload_header(nal_header: [u8; 2]) -> [u8; 2] {
    [(nal_header[0] & 0x81) | (NAL_TYPE_FU << 1), nal_header[1]]
}

/// Rebuilds the original two byte nal unit header from the FU payload
/// header and the FU header type field.
#[inline]
pub fn reassembled_nal_header(payload_header: [u8; 2], fu_header: u8) -> [u8; 2] {
    [
        ((fu_header & 0x3F) << 1) | (payload_header[0] & 0x81),
        payload_header[1],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nal_unit_type() {
        // IDR_W_RADL nal header 0x26 0x01
        assert_eq!(nal_unit_type(0x26), 19);
        assert!(is_irap(19));
        assert!(!is_irap(NAL_TYPE_SPS));
    }

    #[test]
    fn test_fu_round_trip() {
        let payload_header = fu_payload_header([0x26, 0x01]);
        assert_eq!(payload_header, [0x62, 0x01]);
        assert_eq!(nal_unit_type(payload_header[0]), NAL_TYPE_FU);

        let fu_header: u8 = FuHeader {
            start: true,
            end: false,
            nal_type: 19,
        }
        .into();
        assert_eq!(fu_header, 0x93);
        assert_eq!(reassembled_nal_header(payload_header, fu_header), [0x26, 0x01]);
    }

    #[test]
    fn test_fu_header_end_bit() {
        let header = FuHeader::from(0x53);
        assert!(!header.start);
        assert!(header.end);
        assert_eq!(header.nal_type, 0x13);
    }
}
