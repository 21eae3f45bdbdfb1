//! YouTube resolution and merge pipeline
//!
//! YouTube serves high qualities as separate video-only and audio-only
//! streams. The pipeline picks one of each, downloads both and muxes them into
//! a single mp4.

pub mod client;
pub mod formats;
pub mod innertube;
pub mod muxer;
pub mod pipeline;
pub mod sanitize;

pub use client::YouTubeClient;
pub use formats::{select_audio, select_video, StreamFormat, VideoInfo, VideoManifest};
pub use innertube::{InnertubeClient, InnertubeConfig};
pub use muxer::{FfmpegMuxer, MuxOutput, Muxer, MuxerConfig};
pub use pipeline::{MergedStream, YouTubeConfig, YouTubeResolver};
pub use sanitize::sanitize_file_name;
