pub mod rtp_payload_type {
    use crate::codec::PayloadCodec;

    pub const PCMU: u8 = 0;
    pub const PCMA: u8 = 8;
    pub const MPA: u8 = 14;
    pub const MPV: u8 = 32;
    pub const DYNAMIC_VIDEO: u8 = 96;
    pub const DYNAMIC_AUDIO: u8 = 97;

    /// RFC 3551 static assignments where one exists, the conventional
    /// dynamic types otherwise.
    pub fn get_rtp_payload_type(codec: PayloadCodec) -> u8 {
        match codec {
            PayloadCodec::Ulaw => PCMU,
            PayloadCodec::Alaw => PCMA,
            PayloadCodec::Mp3 | PayloadCodec::Mp2 => MPA,
            PayloadCodec::Mpeg2 => MPV,
            codec if codec.is_video() => DYNAMIC_VIDEO,
            _ => DYNAMIC_AUDIO,
        }
    }

    /// The clock rate the payload format pins down, if any. Sample rate
    /// driven codecs take theirs from the track instead.
    pub fn get_rtp_clockrate(codec: PayloadCodec) -> Option<u32> {
        match codec {
            codec if codec.is_video() => Some(90_000),
            PayloadCodec::Mp3 | PayloadCodec::Mp2 => Some(90_000),
            PayloadCodec::Opus => Some(48_000),
            PayloadCodec::Alaw | PayloadCodec::Ulaw => Some(8_000),
            _ => None,
        }
    }

    pub fn get_rtp_encoding_name(codec: PayloadCodec) -> &'static str {
        match codec {
            PayloadCodec::H264 => "H264",
            PayloadCodec::H265 => "H265",
            PayloadCodec::Vp8 => "VP8",
            PayloadCodec::Mpeg2 => "MPV",
            PayloadCodec::Aac => "mpeg4-generic",
            PayloadCodec::Mp3 | PayloadCodec::Mp2 => "MPA",
            PayloadCodec::Ac3 => "ac3",
            PayloadCodec::Alaw => "PCMA",
            PayloadCodec::Ulaw => "PCMU",
            PayloadCodec::Pcm => "L16",
            PayloadCodec::Opus => "opus",
        }
    }

    pub fn from_rtp_encoding_name(encoding_name: &str) -> Option<PayloadCodec> {
        match encoding_name.to_lowercase().as_str() {
            "h264" => Some(PayloadCodec::H264),
            "h265" | "hevc" => Some(PayloadCodec::H265),
            "vp8" => Some(PayloadCodec::Vp8),
            "mpv" => Some(PayloadCodec::Mpeg2),
            "mpeg4-generic" | "aac" => Some(PayloadCodec::Aac),
            "mpa" => Some(PayloadCodec::Mp3),
            "ac3" => Some(PayloadCodec::Ac3),
            "pcma" => Some(PayloadCodec::Alaw),
            "pcmu" => Some(PayloadCodec::Ulaw),
            "l16" => Some(PayloadCodec::Pcm),
            "opus" => Some(PayloadCodec::Opus),
            _ => None,
        }
    }
}
