use std::fmt;

pub mod h264;
pub mod h265;
pub mod mpeg2;
pub mod mpeg4_generic;
pub mod vp8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Video,
}

/// The payload formats this crate can packetize or depacketize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadCodec {
    H264,
    H265,
    Vp8,
    Mpeg2,
    Aac,
    Mp3,
    Mp2,
    Ac3,
    Alaw,
    Ulaw,
    Pcm,
    Opus,
}

impl PayloadCodec {
    pub fn kind(&self) -> MediaKind {
        match self {
            Self::H264 | Self::H265 | Self::Vp8 | Self::Mpeg2 => MediaKind::Video,
            _ => MediaKind::Audio,
        }
    }

    pub fn is_video(&self) -> bool {
        self.kind() == MediaKind::Video
    }

    /// RTP ticks per millisecond for this codec. Video always runs on a
    /// 90kHz clock, as does MPEG audio (RFC 2250); everything else derives
    /// from the sample rate.
    pub fn clock_multiplier(&self, clock_rate: u32) -> f64 {
        if self.is_video() || matches!(self, Self::Mp2 | Self::Mp3) {
            90.0
        } else {
            clock_rate as f64 / 1000.0
        }
    }
}

impl fmt::Display for PayloadCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::H264 => "H264",
            Self::H265 => "HEVC",
            Self::Vp8 => "VP8",
            Self::Mpeg2 => "MPEG2",
            Self::Aac => "AAC",
            Self::Mp3 => "MP3",
            Self::Mp2 => "MP2",
            Self::Ac3 => "AC3",
            Self::Alaw => "ALAW",
            Self::Ulaw => "ULAW",
            Self::Pcm => "PCM",
            Self::Opus => "opus",
        };
        f.write_str(name)
    }
}
