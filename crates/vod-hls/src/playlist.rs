//! Playlist body builders.
//!
//! Both tiers follow the version-3 adaptive-streaming text format. Segment
//! entries always advertise the fixed nominal duration; the real last
//! segment may be shorter, which players tolerate.

use vod_models::{Rendition, SEGMENT_DURATION_SECS};

/// Content type for uploaded playlist objects.
pub const PLAYLIST_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";

/// Build a variant playlist body from signed segment URLs in temporal order.
pub fn build_variant_playlist(segment_urls: &[String]) -> String {
    let mut lines = vec![
        "#EXTM3U".to_string(),
        "#EXT-X-VERSION:3".to_string(),
        format!("#EXT-X-TARGETDURATION:{}", SEGMENT_DURATION_SECS),
        "#EXT-X-MEDIA-SEQUENCE:0".to_string(),
    ];

    for url in segment_urls {
        lines.push(format!("#EXTINF:{}.0,", SEGMENT_DURATION_SECS));
        lines.push(url.clone());
    }

    lines.push("#EXT-X-ENDLIST".to_string());
    lines.join("\n")
}

/// One master playlist entry: a rendition and its signed variant URL.
#[derive(Debug, Clone)]
pub struct MasterEntry {
    pub rendition: Rendition,
    pub variant_url: String,
}

/// Build the master playlist body. Entries appear in the order given
/// (ladder order, highest first); no end-of-list tag for the master tier.
pub fn build_master_playlist(entries: &[MasterEntry]) -> String {
    let mut lines = vec![
        "#EXTM3U".to_string(),
        "#EXT-X-VERSION:3".to_string(),
        String::new(),
    ];

    for entry in entries {
        lines.push(format!(
            "#EXT-X-STREAM-INF:BANDWIDTH={},RESOLUTION={}",
            entry.rendition.bandwidth, entry.rendition.resolution
        ));
        lines.push(entry.variant_url.clone());
        lines.push(String::new());
    }

    lines.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use vod_models::RENDITIONS;

    #[test]
    fn variant_playlist_body() {
        let urls = vec![
            "https://cdn/play/b/transcoded/v/720p/segment_000.ts?sig=a".to_string(),
            "https://cdn/play/b/transcoded/v/720p/segment_001.ts?sig=b".to_string(),
        ];
        let body = build_variant_playlist(&urls);

        assert!(body.starts_with(
            "#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-TARGETDURATION:6\n#EXT-X-MEDIA-SEQUENCE:0\n"
        ));
        assert_eq!(body.matches("#EXTINF:6.0,").count(), 2);
        assert!(body.ends_with("#EXT-X-ENDLIST"));

        // Each duration tag is immediately followed by its URL.
        let lines: Vec<_> = body.lines().collect();
        let first = lines.iter().position(|l| *l == "#EXTINF:6.0,").unwrap();
        assert_eq!(lines[first + 1], urls[0]);
    }

    #[test]
    fn master_playlist_body() {
        let entries: Vec<_> = RENDITIONS
            .iter()
            .map(|r| MasterEntry {
                rendition: *r,
                variant_url: format!("https://cdn/play/b/transcoded/v/{}/playlist.m3u8", r.name),
            })
            .collect();
        let body = build_master_playlist(&entries);

        assert!(body.starts_with("#EXTM3U\n#EXT-X-VERSION:3"));
        assert_eq!(body.matches("#EXT-X-STREAM-INF:").count(), 4);
        assert!(body.contains("BANDWIDTH=5000000,RESOLUTION=1920x1080"));
        assert!(body.contains("BANDWIDTH=800000,RESOLUTION=640x360"));
        assert!(!body.contains("#EXT-X-ENDLIST"));

        // Ladder order preserved.
        let p1080 = body.find("1080p").unwrap();
        let p360 = body.find("360p/playlist").unwrap();
        assert!(p1080 < p360);
    }

    #[test]
    fn empty_master_is_just_the_header() {
        assert_eq!(build_master_playlist(&[]), "#EXTM3U\n#EXT-X-VERSION:3");
    }
}
