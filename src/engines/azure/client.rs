use std::ops::{Deref, DerefMut};

use async_trait::async_trait;
use serde::Deserialize;

/// Output format requested from the service.
pub const DEFAULT_OUTPUT_FORMAT: &str = "audio-16khz-128kbitrate-mono-mp3";

/// Duration ticks per second (the service reports 100-nanosecond ticks).
pub const TICKS_PER_SECOND: u64 = 10_000_000;

/// Duration ticks per millisecond.
pub const TICKS_PER_MS: f64 = 10_000.0;

const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
const OUTPUT_FORMAT_HEADER: &str = "X-Microsoft-OutputFormat";
const SSML_CONTENT_TYPE: &str = "application/ssml+xml";
const USER_AGENT: &str = concat!("azure-tts-rs/", env!("CARGO_PKG_VERSION"));
const FALLBACK_BITRATE_BPS: u64 = 128_000;

#[derive(thiserror::Error, Debug)]
pub enum AzureError {
    #[error(
        "Speech service not configured. Set AZURE_SPEECH_KEY \
         (and optionally AZURE_SPEECH_REGION)."
    )]
    NotConfigured,
    #[error("{0}")]
    Remote(String),
    #[error("Synthesis failed")]
    SynthesisFailed,
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Credentials and output settings for one region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechConfig {
    pub subscription_key: String,
    pub region: String,
    pub output_format: String,
}

impl SpeechConfig {
    fn host(&self) -> String {
        format!("https://{}.tts.speech.microsoft.com", self.region)
    }

    pub fn voices_url(&self) -> String {
        format!("{}/cognitiveservices/voices/list", self.host())
    }

    pub fn synthesis_url(&self) -> String {
        format!("{}/cognitiveservices/v1", self.host())
    }
}

/// A voice as listed by the service.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RemoteVoice {
    pub name: String,
    pub display_name: String,
    pub short_name: String,
    pub gender: String,
    pub locale: String,
    #[serde(default)]
    pub locale_name: String,
    #[serde(default)]
    pub style_list: Option<Vec<String>>,
    pub voice_type: String,
}

impl RemoteVoice {
    pub fn is_neural(&self) -> bool {
        self.voice_type == "Neural"
    }

    pub fn has_styles(&self) -> bool {
        self.style_list.as_ref().is_some_and(|s| !s.is_empty())
    }
}

/// Outcome of a voice-list call. `error_details` is set when the service
/// answered with an error instead of a list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VoicesResult {
    pub voices: Vec<RemoteVoice>,
    pub error_details: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultReason {
    SynthesizingAudioCompleted,
    Canceled,
    Unknown,
}

/// Outcome of a synthesis call as reported by the service.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteSynthesisResult {
    pub reason: ResultReason,
    pub audio: Vec<u8>,
    /// Audio duration in 100-nanosecond ticks
    pub audio_duration_ticks: u64,
    pub error_details: Option<String>,
}

/// A connection-level handle to the service. Must be closed after use.
///
/// `Err` values from the async calls are transport failures; service-level
/// errors are carried inside the returned results.
#[async_trait]
pub trait Synthesizer: Send {
    async fn get_voices(&mut self) -> Result<VoicesResult, String>;

    async fn speak_ssml(&mut self, ssml: &str) -> Result<RemoteSynthesisResult, String>;

    fn close(&mut self);
}

/// Factory for synthesizer handles. Substitute this to run without a network.
pub trait SpeechBackend: Send + Sync {
    fn create_synthesizer(&self, config: &SpeechConfig) -> Box<dyn Synthesizer>;
}

/// Owns a synthesizer for the duration of one call and closes it on drop,
/// so every exit path releases the handle.
pub struct ScopedSynthesizer {
    inner: Box<dyn Synthesizer>,
}

impl ScopedSynthesizer {
    pub fn open(backend: &dyn SpeechBackend, config: &SpeechConfig) -> Self {
        log::debug!("Opening synthesizer for region {}", config.region);
        Self {
            inner: backend.create_synthesizer(config),
        }
    }
}

impl Deref for ScopedSynthesizer {
    type Target = dyn Synthesizer;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref()
    }
}

impl DerefMut for ScopedSynthesizer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.inner.as_mut()
    }
}

impl Drop for ScopedSynthesizer {
    fn drop(&mut self) {
        self.inner.close();
        log::debug!("Synthesizer closed");
    }
}

/// Convert service duration ticks to milliseconds.
pub fn ticks_to_ms(ticks: u64) -> f64 {
    ticks as f64 / TICKS_PER_MS
}

/// Parse the bitrate out of an output format name such as
/// `audio-16khz-128kbitrate-mono-mp3`.
pub fn bitrate_bps(output_format: &str) -> Option<u64> {
    output_format
        .split('-')
        .find_map(|part| part.strip_suffix("kbitrate"))
        .and_then(|kbps| kbps.parse::<u64>().ok())
        .filter(|&kbps| kbps > 0)
        .map(|kbps| kbps * 1000)
}

/// Estimate the duration of constant-bitrate audio in ticks.
pub fn estimate_duration_ticks(audio_len: usize, output_format: &str) -> u64 {
    let bps = bitrate_bps(output_format).unwrap_or(FALLBACK_BITRATE_BPS);
    audio_len as u64 * 8 * TICKS_PER_SECOND / bps
}

/// Backend that talks to the Azure Speech REST endpoints.
#[derive(Debug, Clone, Default)]
pub struct RestBackend {
    http: reqwest::Client,
}

impl RestBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured HTTP client (proxies, timeouts).
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl SpeechBackend for RestBackend {
    fn create_synthesizer(&self, config: &SpeechConfig) -> Box<dyn Synthesizer> {
        Box::new(RestSynthesizer {
            http: Some(self.http.clone()),
            config: config.clone(),
        })
    }
}

struct RestSynthesizer {
    http: Option<reqwest::Client>,
    config: SpeechConfig,
}

impl RestSynthesizer {
    fn http(&self) -> Result<&reqwest::Client, String> {
        self.http
            .as_ref()
            .ok_or_else(|| "Synthesizer already closed".to_string())
    }
}

/// Error text for a non-success status, e.g. `"HTTP 401: Unauthorized"`.
fn http_error_details(status: u16, body: &[u8]) -> String {
    let body = String::from_utf8_lossy(body);
    let body = body.trim();
    if body.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {body}")
    }
}

/// Map a voice-list response onto a [`VoicesResult`].
///
/// A non-success status is a service error; a success body that is not a
/// voice list is a transport failure.
pub(crate) fn voices_from_response(status: u16, body: &[u8]) -> Result<VoicesResult, String> {
    if !(200..300).contains(&status) {
        return Ok(VoicesResult {
            voices: Vec::new(),
            error_details: Some(http_error_details(status, body)),
        });
    }

    let voices = serde_json::from_slice::<Vec<RemoteVoice>>(body).map_err(|e| {
        format!(
            "Failed to parse voice list: {e} (body: {})",
            String::from_utf8_lossy(body).chars().take(200).collect::<String>()
        )
    })?;
    Ok(VoicesResult {
        voices,
        error_details: None,
    })
}

/// Map a synthesis response onto a [`RemoteSynthesisResult`].
pub(crate) fn speech_from_response(
    status: u16,
    body: Vec<u8>,
    output_format: &str,
) -> RemoteSynthesisResult {
    if !(200..300).contains(&status) {
        return RemoteSynthesisResult {
            reason: ResultReason::Canceled,
            audio: Vec::new(),
            audio_duration_ticks: 0,
            error_details: Some(http_error_details(status, &body)),
        };
    }

    if body.is_empty() {
        log::warn!("Service returned success with an empty audio body");
        return RemoteSynthesisResult {
            reason: ResultReason::Unknown,
            audio: body,
            audio_duration_ticks: 0,
            error_details: None,
        };
    }

    let audio_duration_ticks = estimate_duration_ticks(body.len(), output_format);
    RemoteSynthesisResult {
        reason: ResultReason::SynthesizingAudioCompleted,
        audio: body,
        audio_duration_ticks,
        error_details: None,
    }
}

#[async_trait]
impl Synthesizer for RestSynthesizer {
    async fn get_voices(&mut self) -> Result<VoicesResult, String> {
        let response = self
            .http()?
            .get(self.config.voices_url())
            .header(SUBSCRIPTION_KEY_HEADER, &self.config.subscription_key)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| e.to_string())?;
        let result = voices_from_response(status, &body)?;
        if result.error_details.is_none() {
            log::info!(
                "Fetched {} voices from {}",
                result.voices.len(),
                self.config.region
            );
        }
        Ok(result)
    }

    async fn speak_ssml(&mut self, ssml: &str) -> Result<RemoteSynthesisResult, String> {
        let response = self
            .http()?
            .post(self.config.synthesis_url())
            .header(SUBSCRIPTION_KEY_HEADER, &self.config.subscription_key)
            .header(OUTPUT_FORMAT_HEADER, &self.config.output_format)
            .header(reqwest::header::CONTENT_TYPE, SSML_CONTENT_TYPE)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .body(ssml.to_owned())
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| e.to_string())?.to_vec();
        Ok(speech_from_response(status, body, &self.config.output_format))
    }

    fn close(&mut self) {
        self.http = None;
    }
}
