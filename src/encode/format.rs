use std::process::Command;

/// Candidate output formats in preference order.
///
/// MP4/H.264 variants first for QuickTime compatibility, then WebM codecs, with plain WebM as
/// the universal fallback.
pub const FORMAT_PREFERENCE: [&str; 5] = [
    "video/mp4;codecs=h264",
    "video/mp4;codecs=avc1",
    "video/webm;codecs=vp9",
    "video/webm;codecs=vp8",
    "video/webm",
];

/// Format selected when no candidate reports support.
pub const FALLBACK_FORMAT: &str = "video/webm";

/// Runtime capability probe for candidate output formats.
pub trait FormatSupport {
    fn supports(&self, media_type: &str) -> bool;
}

/// Pick the first supported candidate from [`FORMAT_PREFERENCE`], or [`FALLBACK_FORMAT`].
///
/// The negotiated tag determines both the recorder's encoding and the suggested output file
/// extension.
pub fn negotiate_format(support: &dyn FormatSupport) -> &'static str {
    for candidate in FORMAT_PREFERENCE {
        if support.supports(candidate) {
            return candidate;
        }
    }
    FALLBACK_FORMAT
}

/// Suggested output file name for a negotiated format tag.
pub fn suggested_file_name(media_type: &str) -> &'static str {
    if media_type.contains("mp4") {
        "merged_video.mp4"
    } else {
        "merged_video.webm"
    }
}

/// The ffmpeg video encoder used for a format tag, if we know one.
pub(crate) fn encoder_for(media_type: &str) -> Option<&'static str> {
    if media_type.contains("h264") || media_type.contains("avc1") {
        Some("libx264")
    } else if media_type.contains("vp9") {
        Some("libvpx-vp9")
    } else if media_type.contains("vp8") {
        Some("libvpx")
    } else if media_type.contains("webm") {
        // Generic WebM fallback encodes as VP8.
        Some("libvpx")
    } else {
        None
    }
}

/// [`FormatSupport`] backed by the encoder list of the system `ffmpeg` binary.
///
/// The `ffmpeg -encoders` output is captured once at construction.
#[derive(Clone, Debug)]
pub struct FfmpegFormatSupport {
    encoders: String,
}

impl FfmpegFormatSupport {
    pub fn probe() -> Self {
        let encoders = Command::new("ffmpeg")
            .args(["-hide_banner", "-encoders"])
            .output()
            .ok()
            .filter(|out| out.status.success())
            .map(|out| String::from_utf8_lossy(&out.stdout).into_owned())
            .unwrap_or_default();
        Self { encoders }
    }
}

impl FormatSupport for FfmpegFormatSupport {
    fn supports(&self, media_type: &str) -> bool {
        match encoder_for(media_type) {
            // Encoder lines are `FLAGS name description`; match the name column exactly so
            // e.g. `libvpx` does not match a build shipping only `libvpx-vp9`.
            Some(encoder) => self
                .encoders
                .lines()
                .any(|line| line.split_whitespace().nth(1) == Some(encoder)),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSupport(Vec<&'static str>);

    impl FormatSupport for FixedSupport {
        fn supports(&self, media_type: &str) -> bool {
            self.0.contains(&media_type)
        }
    }

    #[test]
    fn first_supported_candidate_wins() {
        let support = FixedSupport(vec!["video/webm;codecs=vp9", "video/mp4;codecs=avc1"]);
        assert_eq!(negotiate_format(&support), "video/mp4;codecs=avc1");
    }

    #[test]
    fn only_fallback_supported_negotiates_fallback_and_webm_name() {
        let support = FixedSupport(vec!["video/webm"]);
        let format = negotiate_format(&support);
        assert_eq!(format, FALLBACK_FORMAT);
        assert_eq!(suggested_file_name(format), "merged_video.webm");
    }

    #[test]
    fn no_support_at_all_still_falls_back() {
        let support = FixedSupport(vec![]);
        assert_eq!(negotiate_format(&support), FALLBACK_FORMAT);
    }

    #[test]
    fn mp4_marker_selects_mp4_extension() {
        assert_eq!(
            suggested_file_name("video/mp4;codecs=h264"),
            "merged_video.mp4"
        );
        assert_eq!(
            suggested_file_name("video/webm;codecs=vp9"),
            "merged_video.webm"
        );
    }

    #[test]
    fn encoder_listing_is_matched_by_name_column_not_substring() {
        let support = FfmpegFormatSupport {
            encoders: concat!(
                "Encoders:\n",
                " V..... libx264              libx264 H.264 / AVC / MPEG-4 AVC\n",
                " V..... libvpx-vp9           libvpx VP9 Encoder (codec vp9)\n",
            )
            .to_string(),
        };
        assert!(support.supports("video/mp4;codecs=h264"));
        assert!(support.supports("video/webm;codecs=vp9"));
        // The vp9 line mentions `libvpx` in both name and description, but only the name
        // column counts.
        assert!(!support.supports("video/webm;codecs=vp8"));
        assert!(!support.supports("video/webm"));
    }

    #[test]
    fn known_candidates_map_to_encoders() {
        for candidate in FORMAT_PREFERENCE {
            assert!(encoder_for(candidate).is_some(), "no encoder for {candidate}");
        }
        assert!(encoder_for("audio/ogg").is_none());
    }
}
