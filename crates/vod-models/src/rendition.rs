//! The fixed rendition ladder and object key scheme.
//!
//! The ladder is shared knowledge between the encoder invocation and the
//! manifest generator: rendition names double as object-key path segments,
//! so the two sides must agree or manifests silently omit renditions.

/// Nominal segment duration in seconds. Every segment except possibly the
/// last is cut at this boundary.
pub const SEGMENT_DURATION_SECS: u32 = 6;

/// One resolution/bitrate variant of the source video.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rendition {
    /// Name, used as an object-key path segment (e.g. "1080p").
    pub name: &'static str,
    /// Scale target width.
    pub target_width: u32,
    /// Scale target height.
    pub target_height: u32,
    /// Video bitrate passed to the encoder (e.g. "5000k").
    pub video_bitrate: &'static str,
    /// Audio bitrate passed to the encoder (e.g. "192k").
    pub audio_bitrate: &'static str,
    /// BANDWIDTH attribute advertised in the master playlist.
    pub bandwidth: u64,
    /// RESOLUTION attribute advertised in the master playlist.
    pub resolution: &'static str,
}

/// The fixed ladder, highest first. Master playlist order follows this.
pub const RENDITIONS: [Rendition; 4] = [
    Rendition {
        name: "1080p",
        target_width: 1920,
        target_height: 1080,
        video_bitrate: "5000k",
        audio_bitrate: "192k",
        bandwidth: 5_000_000,
        resolution: "1920x1080",
    },
    Rendition {
        name: "720p",
        target_width: 1280,
        target_height: 720,
        video_bitrate: "3000k",
        audio_bitrate: "160k",
        bandwidth: 2_800_000,
        resolution: "1280x720",
    },
    Rendition {
        name: "480p",
        target_width: 854,
        target_height: 480,
        video_bitrate: "1500k",
        audio_bitrate: "128k",
        bandwidth: 1_400_000,
        resolution: "854x480",
    },
    Rendition {
        name: "360p",
        target_width: 640,
        target_height: 360,
        video_bitrate: "800k",
        audio_bitrate: "96k",
        bandwidth: 800_000,
        resolution: "640x360",
    },
];

/// Key prefix for one rendition's segments and variant playlist.
pub fn variant_prefix(video_id: &str, rendition: &str) -> String {
    format!("transcoded/{}/{}/", video_id, rendition)
}

/// Object key for a single segment.
///
/// The index is zero-padded to three digits so lexicographic key order
/// equals temporal order. This holds only below 1000 segments (about 100
/// minutes at 6 s per segment); longer videos would need a wider pad or
/// numeric-aware sorting.
pub fn segment_key(video_id: &str, rendition: &str, index: u32) -> String {
    format!(
        "transcoded/{}/{}/segment_{:03}.ts",
        video_id, rendition, index
    )
}

/// Object key for a rendition's variant playlist.
pub fn variant_playlist_key(video_id: &str, rendition: &str) -> String {
    format!("transcoded/{}/{}/playlist.m3u8", video_id, rendition)
}

/// Object key for the master playlist.
pub fn master_playlist_key(video_id: &str) -> String {
    format!("transcoded/{}/playlist.m3u8", video_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ladder_is_highest_first() {
        let names: Vec<_> = RENDITIONS.iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["1080p", "720p", "480p", "360p"]);
        for pair in RENDITIONS.windows(2) {
            assert!(pair[0].bandwidth > pair[1].bandwidth);
            assert!(pair[0].target_height > pair[1].target_height);
        }
    }

    #[test]
    fn segment_keys_are_zero_padded() {
        assert_eq!(
            segment_key("clip1", "720p", 0),
            "transcoded/clip1/720p/segment_000.ts"
        );
        assert_eq!(
            segment_key("clip1", "720p", 42),
            "transcoded/clip1/720p/segment_042.ts"
        );
    }

    #[test]
    fn lexicographic_order_matches_index_order_below_pad_limit() {
        let a = segment_key("v", "360p", 998);
        let b = segment_key("v", "360p", 999);
        assert!(a < b);
    }

    #[test]
    fn lexicographic_order_breaks_at_pad_limit() {
        // Documented latent limit of the three-digit pad: index 1000
        // renders as four digits and sorts before 999.
        let at_limit = segment_key("v", "360p", 999);
        let past_limit = segment_key("v", "360p", 1000);
        assert!(past_limit < at_limit);
    }

    #[test]
    fn playlist_keys() {
        assert_eq!(
            variant_playlist_key("clip1", "480p"),
            "transcoded/clip1/480p/playlist.m3u8"
        );
        assert_eq!(master_playlist_key("clip1"), "transcoded/clip1/playlist.m3u8");
        assert_eq!(variant_prefix("clip1", "480p"), "transcoded/clip1/480p/");
    }
}
