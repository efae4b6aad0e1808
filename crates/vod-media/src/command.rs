//! FFmpeg command builder and runner.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// One encoder output: its mapping/codec arguments followed by the output
/// path (an ffmpeg segment pattern in this pipeline).
#[derive(Debug, Clone)]
pub struct OutputSpec {
    args: Vec<String>,
    path: PathBuf,
}

impl OutputSpec {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            args: Vec::new(),
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Add an output argument (before the output path).
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple output arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

/// Builder for a single-input, multi-output FFmpeg invocation.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Input file path
    input: PathBuf,
    /// Shared filter graph (decode once, branch per output)
    filter_complex: Option<String>,
    /// Outputs in declaration order
    outputs: Vec<OutputSpec>,
    /// Whether to overwrite outputs
    overwrite: bool,
    /// Log level
    log_level: String,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command for one input.
    pub fn new(input: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            filter_complex: None,
            outputs: Vec::new(),
            overwrite: true,
            log_level: "error".to_string(),
        }
    }

    /// Set the shared filter graph.
    pub fn filter_complex(mut self, filter: impl Into<String>) -> Self {
        self.filter_complex = Some(filter.into());
        self
    }

    /// Append an output.
    pub fn output(mut self, output: OutputSpec) -> Self {
        self.outputs.push(output);
        self
    }

    /// Set log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.overwrite {
            args.push("-y".to_string());
        }

        args.push("-v".to_string());
        args.push(self.log_level.clone());

        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().to_string());

        if let Some(ref filter) = self.filter_complex {
            args.push("-filter_complex".to_string());
            args.push(filter.clone());
        }

        for output in &self.outputs {
            args.extend(output.args.clone());
            args.push(output.path.to_string_lossy().to_string());
        }

        args
    }
}

/// Runner for FFmpeg commands.
///
/// Encoding is a single blocking external-process invocation per job; it is
/// not preemptible and carries no internal timeout (an operational watchdog
/// is an external concern).
#[derive(Debug, Default)]
pub struct FfmpegRunner;

impl FfmpegRunner {
    pub fn new() -> Self {
        Self
    }

    /// Run an FFmpeg command to completion. Any nonzero exit is an error.
    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

        let args = cmd.build_args();
        debug!("Running FFmpeg: ffmpeg {}", args.join(" "));

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        let mut stderr = String::new();
        if let Some(mut pipe) = child.stderr.take() {
            pipe.read_to_string(&mut stderr).await?;
        }

        let status = child.wait().await?;

        if status.success() {
            Ok(())
        } else {
            Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with non-zero status",
                (!stderr.is_empty()).then_some(stderr),
                status.code(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_args_orders_input_filter_outputs() {
        let cmd = FfmpegCommand::new("/tmp/in.mp4")
            .filter_complex("[0:v]split=2[a][b]")
            .output(
                OutputSpec::new("/tmp/out/a/segment_%03d.ts")
                    .args(["-map", "[a]", "-c:v", "libx264"]),
            )
            .output(OutputSpec::new("/tmp/out/b/segment_%03d.ts").args(["-map", "[b]"]));

        let args = cmd.build_args();
        assert_eq!(args[0], "-y");
        let i_pos = args.iter().position(|a| a == "-i").unwrap();
        assert_eq!(args[i_pos + 1], "/tmp/in.mp4");

        let fc_pos = args.iter().position(|a| a == "-filter_complex").unwrap();
        assert!(fc_pos > i_pos);

        // Outputs preserve declaration order; each path follows its args.
        let a_pos = args
            .iter()
            .position(|a| a == "/tmp/out/a/segment_%03d.ts")
            .unwrap();
        let b_pos = args
            .iter()
            .position(|a| a == "/tmp/out/b/segment_%03d.ts")
            .unwrap();
        assert!(a_pos < b_pos);
        assert_eq!(args[a_pos - 1], "libx264");
    }
}
