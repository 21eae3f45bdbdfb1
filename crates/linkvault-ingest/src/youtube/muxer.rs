//! Audio/video multiplexing through an external ffmpeg process.

use async_trait::async_trait;
use linkvault_core::AppError;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;

/// Result of a successful mux.
#[derive(Debug, Clone, PartialEq)]
pub struct MuxOutput {
    pub output_path: PathBuf,
    /// Size of the merged file on disk.
    pub byte_size: u64,
    /// Whatever the process printed, kept for debugging.
    pub diagnostics: String,
}

/// Combines a video-only and an audio-only file into one container.
#[async_trait]
pub trait Muxer: Send + Sync {
    /// Mux `video` and `audio` into `output`, overwriting it.
    ///
    /// The process is killed when `deadline` elapses.
    async fn mux(
        &self,
        video: &Path,
        audio: &Path,
        output: &Path,
        deadline: Duration,
    ) -> Result<MuxOutput, AppError>;
}

#[derive(Debug, Clone)]
pub struct MuxerConfig {
    pub ffmpeg_path: String,
    /// Codec the audio track is transcoded to.
    pub audio_codec: String,
}

impl Default for MuxerConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            audio_codec: "aac".to_string(),
        }
    }
}

pub struct FfmpegMuxer {
    config: MuxerConfig,
}

impl FfmpegMuxer {
    pub fn new(config: MuxerConfig) -> Self {
        Self { config }
    }

    fn args(&self, video: &Path, audio: &Path, output: &Path) -> Vec<String> {
        let mut args: Vec<String> = ["-y", "-hide_banner", "-loglevel", "error"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        args.extend_from_slice(&["-i".to_string(), video.to_string_lossy().to_string()]);
        args.extend_from_slice(&["-i".to_string(), audio.to_string_lossy().to_string()]);
        // Video copied as is, audio re-encoded
        args.extend(
            ["-map", "0:v:0", "-map", "1:a:0", "-c:v", "copy", "-c:a"]
                .iter()
                .map(|s| s.to_string()),
        );
        args.push(self.config.audio_codec.clone());
        args.extend_from_slice(&["-movflags".to_string(), "+faststart".to_string()]);
        args.push(output.to_string_lossy().to_string());
        args
    }
}

#[async_trait]
impl Muxer for FfmpegMuxer {
    #[tracing::instrument(skip(self), fields(output = %output.display()))]
    async fn mux(
        &self,
        video: &Path,
        audio: &Path,
        output: &Path,
        deadline: Duration,
    ) -> Result<MuxOutput, AppError> {
        let start = Instant::now();
        let child = Command::new(&self.config.ffmpeg_path)
            .args(self.args(video, audio, output))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let result = match tokio::time::timeout(deadline, child).await {
            Ok(result) => result,
            Err(_) => {
                return Err(AppError::Timeout(format!(
                    "ffmpeg did not finish within {}s",
                    deadline.as_secs()
                )))
            }
        };

        let process_output = result.map_err(|e| {
            let message = if e.kind() == std::io::ErrorKind::NotFound {
                format!("ffmpeg binary not found at '{}'", self.config.ffmpeg_path)
            } else {
                format!("failed to execute ffmpeg: {}", e)
            };
            AppError::Merge {
                message,
                output: String::new(),
            }
        })?;

        let diagnostics = format!(
            "{}{}",
            String::from_utf8_lossy(&process_output.stdout),
            String::from_utf8_lossy(&process_output.stderr)
        );

        if !process_output.status.success() {
            return Err(AppError::Merge {
                message: format!("ffmpeg exited with {}", process_output.status),
                output: diagnostics,
            });
        }

        let byte_size = tokio::fs::metadata(output)
            .await
            .map_err(|e| AppError::Merge {
                message: format!("merged output is missing: {}", e),
                output: diagnostics.clone(),
            })?
            .len();

        tracing::debug!(
            size_bytes = byte_size,
            duration_ms = start.elapsed().as_millis() as u64,
            "Streams merged"
        );

        Ok(MuxOutput {
            output_path: output.to_path_buf(),
            byte_size,
            diagnostics,
        })
    }
}
