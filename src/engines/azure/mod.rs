//! Azure Speech text-to-speech engine implementation.
//!
//! This module provides a synthesis engine backed by the Azure Speech REST
//! API. Synthesis happens entirely on the service; the engine lists voices,
//! builds the SSML for a request and returns the MP3 audio it receives.
//!
//! # Configuration
//!
//! ```bash
//! export AZURE_SPEECH_KEY="your-key"
//! export AZURE_SPEECH_REGION="eastus"  # Optional, defaults to eastus
//! ```
//!
//! Without a key the engine runs in not-configured mode: every call fails with
//! [`AzureError::NotConfigured`] and nothing is sent over the network.
//!
//! # Voice Categories
//!
//! Only neural voices in the configured locale (`en-` by default) are offered.
//! Each is assigned one category from its name:
//!
//! | Name contains | Category |
//! |---|---|
//! | `DragonHD`, `HD` or `Phoenix` | [`VoiceCategory::NeuralHD`] |
//! | `Multilingual` | [`VoiceCategory::Multilingual`] |
//! | anything else | [`VoiceCategory::Neural`] |
//!
//! The HD check wins over the Multilingual check.
//!
//! # Examples
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use azure_tts_rs::{SynthesisEngine, engines::azure::{AzureConfig, AzureEngine, SynthesisRequest}};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = AzureEngine::new(AzureConfig::from_env());
//! let request = SynthesisRequest::new("Hello, world!", "en-US-JennyNeural");
//! let result = engine.synthesize(&request).await?;
//! println!("Got {} bytes, {:.0} ms", result.audio.len(), result.duration_ms);
//! # Ok(())
//! # }
//! ```
//!
//! ## With Style and Prosody
//!
//! ```rust,no_run
//! use azure_tts_rs::{SynthesisEngine, engines::azure::{AzureConfig, AzureEngine, SynthesisRequest}};
//! use std::path::Path;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = AzureEngine::new(AzureConfig::from_env());
//! let request = SynthesisRequest::builder()
//!     .text("We won the match!")
//!     .voice_short_id("en-US-AriaNeural")
//!     .style("excited")
//!     .style_degree(1.5)
//!     .rate("+10%")
//!     .build()?;
//!
//! engine.synthesize_to_file(&request, Path::new("out.mp3")).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod engine;
pub mod ssml;
pub mod voices;

pub use client::{AzureError, RestBackend, SpeechBackend, Synthesizer};
pub use engine::{AzureConfig, AzureEngine, SynthesisRequest, SynthesisRequestBuilder};
pub use voices::{classify, CatalogParams, Gender, VoiceCatalog, VoiceCategory, VoiceDescriptor};
