/// Bytes of MPEG video specific header prefixed to every payload.
pub const VIDEO_HEADER_BYTES: usize = 4;

const SEQUENCE_START_CODE: u8 = 0xB3;
const PICTURE_START_CODE: u8 = 0x00;

/// @see: RFC 2250 3.4
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |    MBZ  |T|         TR        |AN|N|S|B|E|  P  |FBV|BFC|FFV|FFC|
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Mpeg2VideoHeader {
    pub temporal_reference: u16,
    pub sequence_header: bool,
    pub begin_slice: bool,
    pub end_slice: bool,
    pub picture_type: u8,
}

impl Mpeg2VideoHeader {
    /// Scans a payload chunk for sequence and picture start codes and
    /// updates the header fields they carry. The temporal reference and
    /// picture type stick until the next picture header comes along.
    pub fn scan(&mut self, data: &[u8]) {
        for (index, window) in data.windows(4).enumerate() {
            if window[0] != 0x00 || window[1] != 0x00 || window[2] != 0x01 {
                continue;
            }
            match window[3] {
                SEQUENCE_START_CODE => self.sequence_header = true,
                PICTURE_START_CODE if index + 5 < data.len() => {
                    self.temporal_reference = (u16::from(data[index + 4]) << 2)
                        | u16::from(data[index + 5] >> 6);
                    self.picture_type = (data[index + 5] >> 3) & 0x07;
                }
                _ => {}
            }
        }
    }

    /// Per packet flags reset between chunks, the picture fields carry over.
    pub fn next_chunk(&mut self) {
        self.sequence_header = false;
        self.begin_slice = false;
        self.end_slice = false;
    }

    pub fn to_bytes(self) -> [u8; VIDEO_HEADER_BYTES] {
        let mut bytes = [0u8; VIDEO_HEADER_BYTES];
        bytes[0] = ((self.temporal_reference >> 8) & 0x03) as u8;
        bytes[1] = (self.temporal_reference & 0xFF) as u8;
        bytes[2] = self.picture_type & 0x07;
        if self.sequence_header {
            bytes[2] |= 0x20;
        }
        if self.begin_slice {
            bytes[2] |= 0x10;
        }
        if self.end_slice {
            bytes[2] |= 0x08;
        }
        bytes
    }
}
