/// Widens the 32 bit RTP timestamp into a monotonically growing u64.
///
/// A wrap is detected when the previous timestamp sat in the top quarter
/// of the u32 range and the new one sits in the bottom quarter. Stragglers
/// from before the wrap are not un-wrapped; a reorder buffer in front of
/// this type keeps them rare.
#[derive(Debug, Default)]
pub struct RtpTimestampExtender {
    accumulator: u64,
    previous: Option<u32>,
}

impl RtpTimestampExtender {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn extend(&mut self, timestamp: u32) -> u64 {
        if let Some(previous) = self.previous
            && previous >= 0xC000_0000
            && timestamp < 0x4000_0000
        {
            self.accumulator += 1u64 << 32;
        }
        self.previous = Some(timestamp);
        self.accumulator + timestamp as u64
    }

    pub fn wrap_count(&self) -> u64 {
        self.accumulator >> 32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_timestamp_is_returned_raw() {
        let mut extender = RtpTimestampExtender::new();
        assert_eq!(extender.extend(90_000), 90_000);
    }

    #[test]
    fn test_wraparound_extends_into_next_round() {
        let mut extender = RtpTimestampExtender::new();
        assert_eq!(extender.extend(0xFFFF_FF00), 0xFFFF_FF00);
        assert_eq!(extender.extend(0x0000_0100), 0x1_0000_0100);
        assert_eq!(extender.wrap_count(), 1);
    }

    #[test]
    fn test_mid_range_jump_is_not_a_wrap() {
        let mut extender = RtpTimestampExtender::new();
        extender.extend(0x7000_0000);
        assert_eq!(extender.extend(0x1000_0000), 0x1000_0000);
        assert_eq!(extender.wrap_count(), 0);
    }

    #[test]
    fn test_multiple_wraps_accumulate() {
        let mut extender = RtpTimestampExtender::new();
        extender.extend(0xF000_0000);
        extender.extend(0x2000_0000);
        extender.extend(0xD000_0000);
        let extended = extender.extend(0x3000_0000);
        assert_eq!(extended, 2 * (1u64 << 32) + 0x3000_0000);
    }
}
