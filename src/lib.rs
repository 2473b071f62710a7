//! # azure-tts-rs
//!
//! A Rust library providing neural text-to-speech synthesis backed by the
//! Azure Speech service.
//!
//! ## Features
//!
//! - **Voice catalog**: Lists the neural voices of a region, classified as
//!   Neural, Neural HD or Multilingual, and caches them for a session
//! - **SSML requests**: Voice, expressive style and prosody in a single payload
//! - **Session state**: Tracks one synthesis request at a time and owns the
//!   playback handle derived from its audio
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! azure-tts-rs = { version = "2026.10", features = ["azure"] }
//! ```
//!
//! ```ignore
//! use azure_tts_rs::engines::azure::{AzureConfig, AzureEngine, SynthesisRequest};
//! use azure_tts_rs::SynthesisEngine;
//!
//! let engine = AzureEngine::new(AzureConfig::from_env());
//! let request = SynthesisRequest::new("Hello, world!", "en-US-JennyNeural");
//!
//! let result = engine.synthesize(&request).await?;
//! result.write_mp3(std::path::Path::new("speech.mp3"))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod display;
pub mod engines;
pub mod session;

use std::path::Path;

use async_trait::async_trait;

/// Maximum number of characters accepted in a single synthesis request.
pub const MAX_TEXT_CHARS: usize = 5000;

/// File name used when audio is saved without an explicit path.
pub const DEFAULT_DOWNLOAD_NAME: &str = "speech.mp3";

/// The result of a synthesis (text-to-speech) operation.
///
/// Holds the encoded MP3 bytes exactly as the service returned them.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisResult {
    /// Encoded audio (MP3)
    pub audio: Vec<u8>,
    /// Duration of the audio in milliseconds
    pub duration_ms: f64,
}

impl SynthesisResult {
    /// Write the encoded audio to a file.
    pub fn write_mp3(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, &self.audio)
    }

    /// Duration of the audio in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.duration_ms / 1000.0
    }
}

/// Common interface for remote text-to-speech engines.
///
/// Each engine defines its own voice, request and error types. Engines are
/// constructed explicitly and shared by reference; there is no global instance.
#[async_trait]
pub trait SynthesisEngine: Send + Sync {
    /// Voice description returned by [`SynthesisEngine::list_voices`]
    type Voice: Send;
    /// A single synthesis request (text, voice, style, prosody)
    type Request: Send + Sync;
    /// Engine error type
    type Error: std::error::Error + From<std::io::Error> + Send + Sync + 'static;

    /// Whether credentials are present. Unconfigured engines make no remote calls.
    fn is_configured(&self) -> bool;

    /// Fetch the voices this engine offers.
    async fn list_voices(&self) -> Result<Vec<Self::Voice>, Self::Error>;

    /// Synthesize speech for the given request.
    async fn synthesize(&self, request: &Self::Request) -> Result<SynthesisResult, Self::Error>;

    /// Synthesize speech and write the audio to a file.
    ///
    /// Default implementation calls `synthesize()` then `SynthesisResult::write_mp3()`.
    async fn synthesize_to_file(
        &self,
        request: &Self::Request,
        path: &Path,
    ) -> Result<(), Self::Error> {
        let result = self.synthesize(request).await?;
        result.write_mp3(path)?;
        Ok(())
    }
}
