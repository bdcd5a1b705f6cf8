use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Offset in seconds between the unix epoch and the ntp epoch (1900-01-01).
const NTP_EPOCH_OFFSET: u64 = 0x83AA7E80;

#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleNtp {
    seconds: u32,
    fraction: u32,
}

impl From<u64> for SimpleNtp {
    fn from(value: u64) -> Self {
        Self {
            seconds: ((value >> 32) & 0xFFFF_FFFF) as u32,
            fraction: (value & 0xFFFF_FFFF) as u32,
        }
    }
}

impl From<SimpleNtp> for u64 {
    fn from(value: SimpleNtp) -> Self {
        ((value.seconds as u64) << 32) | (value.fraction as u64)
    }
}

impl From<SystemTime> for SimpleNtp {
    fn from(value: SystemTime) -> Self {
        let duration = value
            .duration_since(UNIX_EPOCH)
            .unwrap_or_else(|_| Duration::from_secs(0))
            .as_nanos() as u64;
        let seconds = duration / 1_000_000_000 + NTP_EPOCH_OFFSET;
        let mut fraction = duration % 1_000_000_000;
        fraction <<= 32;
        fraction /= 1_000_000_000;
        Self {
            seconds: seconds as u32,
            fraction: fraction as u32,
        }
    }
}

impl From<SimpleNtp> for SystemTime {
    fn from(value: SimpleNtp) -> Self {
        let value: u64 = value.into();
        let seconds = (value >> 32).saturating_sub(NTP_EPOCH_OFFSET);
        let mut fraction = value & 0xFFFF_FFFF;
        fraction *= 1_000_000_000;
        fraction >>= 32;
        let duration = seconds * 1_000_000_000 + fraction;

        UNIX_EPOCH
            .checked_add(Duration::new(
                duration / 1_000_000_000,
                (duration % 1_000_000_000) as u32,
            ))
            .unwrap_or(UNIX_EPOCH)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleShortNtp {
    seconds: u16,
    fraction: u16,
}

impl From<u32> for SimpleShortNtp {
    fn from(value: u32) -> Self {
        Self {
            seconds: ((value >> 16) & 0xFFFF) as u16,
            fraction: (value & 0xFFFF) as u16,
        }
    }
}

impl From<SimpleNtp> for SimpleShortNtp {
    fn from(value: SimpleNtp) -> Self {
        Self {
            seconds: value.seconds as u16,
            fraction: (value.fraction >> 16) as u16,
        }
    }
}

impl From<SimpleShortNtp> for u32 {
    fn from(value: SimpleShortNtp) -> Self {
        ((value.seconds as u32) << 16) | (value.fraction as u32)
    }
}

impl From<SimpleShortNtp> for SimpleNtp {
    fn from(value: SimpleShortNtp) -> Self {
        SimpleNtp {
            seconds: value.seconds as u32,
            fraction: (value.fraction as u32) << 16,
        }
    }
}

impl From<SystemTime> for SimpleShortNtp {
    fn from(value: SystemTime) -> Self {
        let ntp: SimpleNtp = value.into();
        ntp.into()
    }
}

impl From<SimpleShortNtp> for SystemTime {
    fn from(value: SimpleShortNtp) -> Self {
        let ntp: SimpleNtp = value.into();
        ntp.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_epoch_maps_to_ntp_offset() {
        let ntp: SimpleNtp = UNIX_EPOCH.into();
        let bits: u64 = ntp.into();
        assert_eq!(bits >> 32, NTP_EPOCH_OFFSET);
        assert_eq!(bits & 0xFFFF_FFFF, 0);
    }

    #[test]
    fn test_system_time_round_trip_is_close() {
        let time = UNIX_EPOCH + Duration::new(1_700_000_000, 500_000_000);
        let ntp: SimpleNtp = time.into();
        let back: SystemTime = ntp.into();
        let error = back
            .duration_since(time)
            .unwrap_or_else(|e| e.duration())
            .as_nanos();
        // the 32 bit fraction resolves about 0.23ns, allow a little slack
        assert!(error < 10);
    }

    #[test]
    fn test_short_ntp_keeps_middle_bits() {
        let ntp = SimpleNtp {
            seconds: 0xAABB_CCDD,
            fraction: 0x1122_3344,
        };
        let short: SimpleShortNtp = ntp.into();
        let bits: u32 = short.into();
        assert_eq!(bits, 0xCCDD_1122);
    }
}
