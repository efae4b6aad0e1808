//! The `MediaEncoder` capability and its FFmpeg adapter.

use std::path::Path;

use async_trait::async_trait;
use tracing::info;

use vod_models::{RENDITIONS, SEGMENT_DURATION_SECS};

use crate::command::{FfmpegCommand, FfmpegRunner, OutputSpec};
use crate::error::{MediaError, MediaResult};

/// One operation: branch a decoded input into every rendition of the fixed
/// ladder and segment each branch at the nominal duration.
///
/// Unit tests substitute a fake producing canned output trees, so pipeline
/// logic is tested without real media processing.
#[async_trait]
pub trait MediaEncoder: Send + Sync {
    /// Encode `input` into `output_dir/{rendition}/segment_{index:03}.ts`
    /// files for every rendition in the ladder.
    async fn encode(&self, input: &Path, output_dir: &Path) -> MediaResult<()>;
}

/// Build the single-pass ladder invocation: one shared decode, a split
/// filter branching into per-rendition scale/pad chains, and one segmented
/// output per rendition.
pub fn build_ladder_command(input: &Path, output_dir: &Path) -> FfmpegCommand {
    let mut graph = vec![format!(
        "[0:v]split={}{}",
        RENDITIONS.len(),
        RENDITIONS
            .iter()
            .map(|r| format!("[v{}]", r.name))
            .collect::<String>()
    )];

    for r in &RENDITIONS {
        // force_original_aspect_ratio + even-dimension pad keeps any input
        // aspect ratio encodable by libx264.
        graph.push(format!(
            "[v{name}]scale=w={w}:h={h}:force_original_aspect_ratio=decrease,\
             pad=ceil(iw/2)*2:ceil(ih/2)*2[v{name}out]",
            name = r.name,
            w = r.target_width,
            h = r.target_height,
        ));
    }

    let mut cmd = FfmpegCommand::new(input).filter_complex(graph.join("; "));

    for r in &RENDITIONS {
        let pattern = output_dir.join(r.name).join("segment_%03d.ts");
        cmd = cmd.output(
            OutputSpec::new(pattern)
                .args(["-map", &format!("[v{}out]", r.name)])
                .args(["-map", "0:a?"])
                .args(["-c:v", "libx264"])
                .args(["-b:v", r.video_bitrate])
                .args(["-c:a", "aac"])
                .args(["-b:a", r.audio_bitrate])
                .args(["-preset", "medium"])
                .args(["-crf", "23"])
                .args(["-ac", "2"])
                .args(["-f", "segment"])
                .args(["-segment_time", &SEGMENT_DURATION_SECS.to_string()])
                .args(["-segment_format", "mpegts"]),
        );
    }

    cmd
}

/// Production adapter shelling out to the `ffmpeg` binary.
#[derive(Debug, Default)]
pub struct FfmpegEncoder {
    runner: FfmpegRunner,
}

impl FfmpegEncoder {
    pub fn new() -> Self {
        Self {
            runner: FfmpegRunner::new(),
        }
    }
}

#[async_trait]
impl MediaEncoder for FfmpegEncoder {
    async fn encode(&self, input: &Path, output_dir: &Path) -> MediaResult<()> {
        if !input.exists() {
            return Err(MediaError::FileNotFound(input.to_path_buf()));
        }

        for r in &RENDITIONS {
            tokio::fs::create_dir_all(output_dir.join(r.name)).await?;
        }

        info!(
            "Encoding {} into {} renditions under {}",
            input.display(),
            RENDITIONS.len(),
            output_dir.display()
        );

        let cmd = build_ladder_command(input, output_dir);
        self.runner.run(&cmd).await
    }
}
