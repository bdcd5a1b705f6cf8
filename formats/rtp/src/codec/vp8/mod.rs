/// @see: RFC 7741 4.2
/// ```text
///      0 1 2 3 4 5 6 7
///     +-+-+-+-+-+-+-+-+
///     |X|R|N|S|R| PID | (REQUIRED)
///     +-+-+-+-+-+-+-+-+
/// X:  |I|L|T|K| RSV   | (OPTIONAL)
///     +-+-+-+-+-+-+-+-+
/// I:  |M| PictureID   | (OPTIONAL)
///     +-+-+-+-+-+-+-+-+
/// L:  |   TL0PICIDX   | (OPTIONAL)
///     +-+-+-+-+-+-+-+-+
/// T/K:|TID|Y| KEYIDX  | (OPTIONAL)
///     +-+-+-+-+-+-+-+-+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vp8PayloadDescriptor {
    pub extended: bool,
    pub non_reference: bool,
    pub start_of_partition: bool,
    pub partition_index: u8,
    bytes: usize,
}

impl Vp8PayloadDescriptor {
    /// Parses the descriptor at the front of an RTP payload. Returns None
    /// when the payload ends inside the descriptor's flag bytes. The
    /// optional fields are only measured, never decoded.
    pub fn parse(payload: &[u8]) -> Option<Self> {
        let first = *payload.first()?;
        let extended = (first & 0x80) != 0;
        let mut bytes = 1;
        if extended {
            let second = *payload.get(1)?;
            bytes += 1;
            let picture_id = (second & 0x80) != 0;
            let tl0_pic_idx = (second & 0x40) != 0;
            let tid = (second & 0x20) != 0;
            let key_idx = (second & 0x10) != 0;
            if picture_id {
                // M bit extends the picture id to 15 bits
                let extended_picture_id = (*payload.get(2)? & 0x80) != 0;
                bytes += 1 + usize::from(extended_picture_id);
            }
            bytes += usize::from(tl0_pic_idx) + usize::from(tid || key_idx);
        }
        Some(Self {
            extended,
            non_reference: (first & 0x20) != 0,
            start_of_partition: (first & 0x10) != 0,
            partition_index: first & 0x07,
            bytes,
        })
    }

    pub fn bytes_count(&self) -> usize {
        self.bytes
    }

    /// The first packet of a frame starts partition zero.
    pub fn starts_frame(&self) -> bool {
        self.start_of_partition && self.partition_index == 0
    }
}

/// The minimal one byte descriptor used when sending: S bit on the first
/// packet of a frame, N bit on every packet of a droppable frame.
pub fn descriptor_byte(start_of_partition: bool, keyframe: bool) -> u8 {
    let mut byte = 0;
    if start_of_partition {
        byte |= 0x10;
    }
    if !keyframe {
        byte |= 0x20;
    }
    byte
}

/// An inverted bit in the first byte of the frame header marks a keyframe.
#[inline]
pub fn is_keyframe(frame_first_byte: u8) -> bool {
    (frame_first_byte & 0x01) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_descriptor() {
        let descriptor = Vp8PayloadDescriptor::parse(&[0x10, 0xAA]).unwrap();
        assert!(!descriptor.extended);
        assert!(descriptor.starts_frame());
        assert_eq!(descriptor.bytes_count(), 1);
    }

    #[test]
    fn test_extended_descriptor() {
        // X|S, then I|L|T|K, then a 15 bit picture id
        let descriptor =
            Vp8PayloadDescriptor::parse(&[0x90, 0xF0, 0x85, 0x11, 0x02, 0x60, 0xAA])
                .unwrap();
        assert!(descriptor.extended);
        assert!(descriptor.starts_frame());
        assert_eq!(descriptor.bytes_count(), 6);
    }

    #[test]
    fn test_short_picture_id() {
        // I set with the M bit clear keeps the picture id to one byte
        let descriptor = Vp8PayloadDescriptor::parse(&[0x80, 0x80, 0x7F]).unwrap();
        assert_eq!(descriptor.bytes_count(), 3);
    }

    #[test]
    fn test_partition_continuation() {
        let descriptor = Vp8PayloadDescriptor::parse(&[0x01]).unwrap();
        assert!(!descriptor.start_of_partition);
        assert_eq!(descriptor.partition_index, 1);
        assert!(!descriptor.starts_frame());
    }

    #[test]
    fn test_truncated_flags() {
        assert!(Vp8PayloadDescriptor::parse(&[]).is_none());
        assert!(Vp8PayloadDescriptor::parse(&[0x80]).is_none());
        assert!(Vp8PayloadDescriptor::parse(&[0x80, 0x80]).is_none());
    }

    #[test]
    fn test_descriptor_byte() {
        assert_eq!(descriptor_byte(true, true), 0x10);
        assert_eq!(descriptor_byte(true, false), 0x30);
        assert_eq!(descriptor_byte(false, false), 0x20);
    }

    #[test]
    fn test_keyframe_bit() {
        assert!(is_keyframe(0x50));
        assert!(!is_keyframe(0x51));
    }
}
