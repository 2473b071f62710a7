use std::sync::Arc;

use async_trait::async_trait;
use derive_builder::Builder;

use crate::{SynthesisEngine, SynthesisResult, MAX_TEXT_CHARS};

use super::client::{
    ticks_to_ms, AzureError, ResultReason, RestBackend, ScopedSynthesizer, SpeechBackend,
    SpeechConfig, DEFAULT_OUTPUT_FORMAT,
};
use super::ssml::{build_payload, DEFAULT_PROSODY, DEFAULT_STYLE};
use super::voices::{select_voices, VoiceDescriptor};

/// Environment variable holding the subscription key.
pub const KEY_ENV: &str = "AZURE_SPEECH_KEY";
/// Environment variable holding the service region.
pub const REGION_ENV: &str = "AZURE_SPEECH_REGION";
/// Region used when none is configured.
pub const DEFAULT_REGION: &str = "eastus";
/// Only voices whose locale starts with this prefix are offered by default.
pub const DEFAULT_LOCALE_PREFIX: &str = "en-";

/// Parameters for connecting to the Azure Speech service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AzureConfig {
    /// Subscription key. `None` puts the engine into not-configured mode.
    pub subscription_key: Option<String>,
    /// Service region, e.g. `"eastus"`.
    pub region: String,
    /// Locale prefix used to filter the voice list.
    pub locale_prefix: String,
    /// Audio output format name sent to the service.
    pub output_format: String,
}

impl Default for AzureConfig {
    fn default() -> Self {
        Self {
            subscription_key: None,
            region: DEFAULT_REGION.to_string(),
            locale_prefix: DEFAULT_LOCALE_PREFIX.to_string(),
            output_format: DEFAULT_OUTPUT_FORMAT.to_string(),
        }
    }
}

impl AzureConfig {
    /// Read `AZURE_SPEECH_KEY` and `AZURE_SPEECH_REGION`.
    ///
    /// An empty key counts as missing. The region falls back to `eastus`.
    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Create a configuration with an explicit key and region.
    pub fn with_key(key: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            subscription_key: Some(key.into()),
            region: region.into(),
            ..Default::default()
        }
    }

    pub(crate) fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            subscription_key: non_empty(KEY_ENV),
            region: non_empty(REGION_ENV).unwrap_or_else(|| DEFAULT_REGION.to_string()),
            ..Default::default()
        }
    }

    fn speech_config(&self) -> Option<SpeechConfig> {
        self.subscription_key.as_ref().map(|key| SpeechConfig {
            subscription_key: key.clone(),
            region: self.region.clone(),
            output_format: self.output_format.clone(),
        })
    }
}

/// Parameters for a single synthesis request.
///
/// ```rust
/// use azure_tts_rs::engines::azure::SynthesisRequest;
///
/// let request = SynthesisRequest::builder()
///     .text("Hello!")
///     .voice_short_id("en-US-AriaNeural")
///     .style("cheerful")
///     .build()?;
/// assert_eq!(request.style_degree, 1.0);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, PartialEq, Builder)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct SynthesisRequest {
    /// Text to speak, at most 5000 characters.
    #[builder(setter(into))]
    pub text: String,
    /// Voice short name (e.g. `"en-US-JennyNeural"`).
    #[builder(setter(into))]
    pub voice_short_id: String,
    /// Expressive style. `None`, `""` or `"default"` means no style.
    #[builder(default, setter(into, strip_option))]
    pub style: Option<String>,
    /// Style intensity, default 1.
    #[builder(default = "1.0")]
    pub style_degree: f32,
    #[builder(default = "DEFAULT_PROSODY.to_string()", setter(into))]
    pub pitch: String,
    #[builder(default = "DEFAULT_PROSODY.to_string()", setter(into))]
    pub rate: String,
}

impl SynthesisRequestBuilder {
    fn validate(&self) -> Result<(), String> {
        match &self.text {
            Some(text) if text.chars().count() > MAX_TEXT_CHARS => Err(format!(
                "text exceeds {MAX_TEXT_CHARS} characters"
            )),
            _ => Ok(()),
        }
    }
}

impl SynthesisRequest {
    /// Request with default style and prosody.
    pub fn new(text: impl Into<String>, voice_short_id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice_short_id: voice_short_id.into(),
            style: None,
            style_degree: 1.0,
            pitch: DEFAULT_PROSODY.to_string(),
            rate: DEFAULT_PROSODY.to_string(),
        }
    }

    pub fn builder() -> SynthesisRequestBuilder {
        SynthesisRequestBuilder::default()
    }

    /// The style to express, unless absent, empty or the default sentinel.
    pub fn expressive_style(&self) -> Option<&str> {
        self.style
            .as_deref()
            .filter(|s| !s.is_empty() && *s != DEFAULT_STYLE)
    }

    /// Reject text the service would not accept: blank or too long.
    pub fn validate(&self) -> Result<(), AzureError> {
        if self.text.trim().is_empty() {
            return Err(AzureError::InvalidRequest("text is empty".to_string()));
        }
        let chars = self.text.chars().count();
        if chars > MAX_TEXT_CHARS {
            return Err(AzureError::InvalidRequest(format!(
                "text is {chars} characters, maximum is {MAX_TEXT_CHARS}"
            )));
        }
        Ok(())
    }
}

/// Azure Speech text-to-speech engine.
///
/// Each call opens its own synthesizer handle and closes it before returning,
/// whatever the outcome.
///
/// # Quick Start
///
/// ```rust,no_run
/// use azure_tts_rs::{SynthesisEngine, engines::azure::{AzureConfig, AzureEngine, SynthesisRequest}};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let engine = AzureEngine::new(AzureConfig::from_env());
/// let voices = engine.list_voices().await?;
/// let request = SynthesisRequest::new("Hello, world!", &voices[0].short_name);
/// let result = engine.synthesize(&request).await?;
/// # Ok(())
/// # }
/// ```
pub struct AzureEngine {
    speech_config: Option<SpeechConfig>,
    locale_prefix: String,
    backend: Arc<dyn SpeechBackend>,
}

impl AzureEngine {
    /// Create an engine that talks to the REST endpoints.
    pub fn new(config: AzureConfig) -> Self {
        Self::with_backend(config, Arc::new(RestBackend::new()))
    }

    /// Create an engine on top of a custom backend.
    pub fn with_backend(config: AzureConfig, backend: Arc<dyn SpeechBackend>) -> Self {
        let speech_config = config.speech_config();
        if speech_config.is_none() {
            log::warn!("{KEY_ENV} is not set; speech synthesis is disabled");
        }
        Self {
            speech_config,
            locale_prefix: config.locale_prefix,
            backend,
        }
    }

    pub fn region(&self) -> Option<&str> {
        self.speech_config.as_ref().map(|c| c.region.as_str())
    }

    fn credentials(&self) -> Result<&SpeechConfig, AzureError> {
        self.speech_config.as_ref().ok_or(AzureError::NotConfigured)
    }

    fn open(&self) -> Result<ScopedSynthesizer, AzureError> {
        Ok(ScopedSynthesizer::open(self.backend.as_ref(), self.credentials()?))
    }
}

#[async_trait]
impl SynthesisEngine for AzureEngine {
    type Voice = VoiceDescriptor;
    type Request = SynthesisRequest;
    type Error = AzureError;

    fn is_configured(&self) -> bool {
        self.speech_config.is_some()
    }

    async fn list_voices(&self) -> Result<Vec<VoiceDescriptor>, AzureError> {
        let mut synthesizer = self.open()?;
        let result = synthesizer.get_voices().await.map_err(AzureError::Remote)?;
        drop(synthesizer);

        if let Some(details) = result.error_details {
            return Err(AzureError::Remote(details));
        }

        let total = result.voices.len();
        let voices = select_voices(result.voices, &self.locale_prefix);
        log::info!(
            "Offering {} of {total} voices (locale prefix '{}')",
            voices.len(),
            self.locale_prefix
        );
        Ok(voices)
    }

    async fn synthesize(&self, request: &SynthesisRequest) -> Result<SynthesisResult, AzureError> {
        self.credentials()?;
        request.validate()?;

        let mut synthesizer = self.open()?;
        let ssml = build_payload(request);
        log::debug!(
            "Synthesizing {} characters with {}",
            request.text.chars().count(),
            request.voice_short_id
        );
        let result = synthesizer.speak_ssml(&ssml).await.map_err(AzureError::Remote)?;

        match result.reason {
            ResultReason::SynthesizingAudioCompleted => Ok(SynthesisResult {
                duration_ms: ticks_to_ms(result.audio_duration_ticks),
                audio: result.audio,
            }),
            ResultReason::Canceled => Err(AzureError::Remote(format!(
                "Synthesis canceled: {}",
                result.error_details.unwrap_or_default()
            ))),
            ResultReason::Unknown => Err(AzureError::SynthesisFailed),
        }
    }
}
