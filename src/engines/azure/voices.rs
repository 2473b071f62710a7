use std::cmp::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use crate::SynthesisEngine;

use super::client::{AzureError, RemoteVoice};
use super::ssml::DEFAULT_STYLE;

/// Classification bucket for a neural voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoiceCategory {
    Neural,
    NeuralHD,
    Multilingual,
}

impl VoiceCategory {
    pub const ALL: [VoiceCategory; 3] = [
        VoiceCategory::Neural,
        VoiceCategory::NeuralHD,
        VoiceCategory::Multilingual,
    ];

    /// Human readable label.
    pub fn label(&self) -> &'static str {
        match self {
            VoiceCategory::Neural => "Neural",
            VoiceCategory::NeuralHD => "Neural HD",
            VoiceCategory::Multilingual => "Multilingual",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoiceType {
    Neural,
    Standard,
}

/// A voice offered to the user. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceDescriptor {
    pub name: String,
    pub display_name: String,
    pub short_name: String,
    pub locale: String,
    pub locale_name: String,
    pub gender: Gender,
    /// Expressive styles; `None` when the voice has none.
    pub style_list: Option<Vec<String>>,
    pub voice_type: VoiceType,
    pub category: VoiceCategory,
}

impl VoiceDescriptor {
    /// Convert a listed voice, or `None` if it is not offered at all.
    pub fn from_remote(remote: RemoteVoice) -> Option<Self> {
        let category = classify(&remote.name, remote.is_neural(), remote.has_styles())?;
        let gender = if remote.gender == "Male" {
            Gender::Male
        } else {
            Gender::Female
        };
        let style_list = remote.style_list.filter(|s| !s.is_empty());

        Some(Self {
            name: remote.name,
            display_name: remote.display_name,
            short_name: remote.short_name,
            locale: remote.locale,
            locale_name: remote.locale_name,
            gender,
            style_list,
            voice_type: VoiceType::Neural,
            category,
        })
    }

    pub fn has_styles(&self) -> bool {
        self.style_list.is_some()
    }

    /// Label for a voice picker, e.g. `"Jenny (Female)"`.
    pub fn option_label(&self) -> String {
        format!("{} ({:?})", self.display_name, self.gender)
    }
}

/// Decide which category a voice belongs to.
///
/// Standard voices are excluded (`None`). Among neural voices the name is
/// checked for HD patterns first, then for `Multilingual`; anything else is
/// plain `Neural`. Style availability never changes the category.
pub fn classify(name: &str, is_neural: bool, _has_styles: bool) -> Option<VoiceCategory> {
    if !is_neural {
        return None;
    }

    if name.contains("DragonHD") || name.contains("HD") || name.contains("Phoenix") {
        return Some(VoiceCategory::NeuralHD);
    }

    if name.contains("Multilingual") {
        return Some(VoiceCategory::Multilingual);
    }

    Some(VoiceCategory::Neural)
}

/// Keep neural voices in the given locale and sort them by display name.
///
/// Voices that do not qualify are dropped silently.
pub fn select_voices(remote: Vec<RemoteVoice>, locale_prefix: &str) -> Vec<VoiceDescriptor> {
    let mut voices: Vec<VoiceDescriptor> = remote
        .into_iter()
        .filter(|v| v.locale.starts_with(locale_prefix))
        .filter_map(VoiceDescriptor::from_remote)
        .collect();
    voices.sort_by(|a, b| compare_display_names(&a.display_name, &b.display_name));
    voices
}

/// Collation order for display names.
///
/// Base letters decide first, so accents and case only break ties, the way
/// a root-locale collator orders them. The raw string settles the rest.
fn compare_display_names(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
        .then_with(|| a.cmp(b))
}

/// Lowercased text with combining marks stripped after NFD decomposition.
fn collation_key(s: &str) -> String {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Parameters for the voice catalog cache.
#[derive(Debug, Clone)]
pub struct CatalogParams {
    /// How long a fetched list is served without refetching.
    pub stale_after: Duration,
    /// Extra attempts after a failed fetch.
    pub retries: u32,
    /// Delay before the first retry; doubled for each further retry.
    pub retry_delay: Duration,
}

impl Default for CatalogParams {
    fn default() -> Self {
        Self {
            stale_after: Duration::from_secs(30 * 60),
            retries: 2,
            retry_delay: Duration::from_secs(1),
        }
    }
}

struct CachedVoices {
    voices: Arc<Vec<VoiceDescriptor>>,
    fetched_at: Instant,
}

/// Memoizes the voice list of an engine for a session.
///
/// Concurrent callers share one fetch. Failed fetches are not cached.
pub struct VoiceCatalog<E> {
    engine: Arc<E>,
    params: CatalogParams,
    cache: Mutex<Option<CachedVoices>>,
}

impl<E> VoiceCatalog<E>
where
    E: SynthesisEngine<Voice = VoiceDescriptor, Error = AzureError>,
{
    pub fn new(engine: Arc<E>) -> Self {
        Self::with_params(engine, CatalogParams::default())
    }

    pub fn with_params(engine: Arc<E>, params: CatalogParams) -> Self {
        Self {
            engine,
            params,
            cache: Mutex::new(None),
        }
    }

    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    /// The cached voice list, fetching it when missing or stale.
    pub async fn voices(&self) -> Result<Arc<Vec<VoiceDescriptor>>, AzureError> {
        if !self.engine.is_configured() {
            return Err(AzureError::NotConfigured);
        }

        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.as_ref() {
            if cached.fetched_at.elapsed() < self.params.stale_after {
                return Ok(cached.voices.clone());
            }
            log::debug!("Voice list is stale, refetching");
        }

        let voices = Arc::new(self.fetch_with_retry().await?);
        *cache = Some(CachedVoices {
            voices: voices.clone(),
            fetched_at: Instant::now(),
        });
        Ok(voices)
    }

    /// Discard the cached list; the next call refetches.
    pub async fn invalidate(&self) {
        *self.cache.lock().await = None;
    }

    /// Voices of one category, in display-name order.
    pub async fn by_category(
        &self,
        category: VoiceCategory,
    ) -> Result<Vec<VoiceDescriptor>, AzureError> {
        Ok(self
            .voices()
            .await?
            .iter()
            .filter(|v| v.category == category)
            .cloned()
            .collect())
    }

    /// Style options for a voice, `"default"` first.
    ///
    /// Empty when the voice is unknown or has no styles.
    pub async fn styles_for(&self, short_name: &str) -> Result<Vec<String>, AzureError> {
        let voices = self.voices().await?;
        let styles = voices
            .iter()
            .find(|v| v.short_name == short_name)
            .and_then(|v| v.style_list.as_ref());

        Ok(match styles {
            Some(styles) => std::iter::once(DEFAULT_STYLE.to_string())
                .chain(styles.iter().cloned())
                .collect(),
            None => Vec::new(),
        })
    }

    async fn fetch_with_retry(&self) -> Result<Vec<VoiceDescriptor>, AzureError> {
        let mut attempt = 0u32;
        loop {
            match self.engine.list_voices().await {
                Ok(voices) => return Ok(voices),
                Err(AzureError::NotConfigured) => return Err(AzureError::NotConfigured),
                Err(e) if attempt < self.params.retries => {
                    let delay = self.params.retry_delay * 2u32.saturating_pow(attempt);
                    log::warn!(
                        "Voice list fetch failed (attempt {}): {e}; retrying in {delay:?}",
                        attempt + 1
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering as AtomicOrdering;
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::engines::azure::client::VoicesResult;
    use crate::engines::azure::engine::tests::{remote_voice, FakeBackend};
    use crate::engines::azure::{AzureConfig, AzureEngine};

    #[test]
    fn classifies_hd_voices_first() {
        assert_eq!(
            classify("en-US-JennyHDNeural", true, true),
            Some(VoiceCategory::NeuralHD)
        );
        assert_eq!(
            classify("en-US-Ava:DragonHDLatestNeural", true, false),
            Some(VoiceCategory::NeuralHD)
        );
        assert_eq!(
            classify("en-US-PhoenixNeural", true, false),
            Some(VoiceCategory::NeuralHD)
        );
        assert_eq!(
            classify("en-US-AvaMultilingualHDNeural", true, false),
            Some(VoiceCategory::NeuralHD)
        );
    }

    #[test]
    fn classifies_multilingual_voices() {
        assert_eq!(
            classify("en-US-AvaMultilingualNeural", true, true),
            Some(VoiceCategory::Multilingual)
        );
        assert_eq!(
            classify("en-US-JennyMultilingual", true, false),
            Some(VoiceCategory::Multilingual)
        );
    }

    #[test]
    fn excludes_standard_voices() {
        assert_eq!(classify("en-US-AriaRUS", false, true), None);
        assert_eq!(classify("en-US-JennyHDNeural", false, false), None);
        assert_eq!(classify("en-US-AvaMultilingualNeural", false, true), None);
    }

    #[test]
    fn plain_neural_ignores_styles() {
        assert_eq!(
            classify("en-US-EricNeural", true, false),
            Some(VoiceCategory::Neural)
        );
        assert_eq!(
            classify("en-US-JennyNeural", true, true),
            Some(VoiceCategory::Neural)
        );
    }

    #[test]
    fn hd_match_is_case_sensitive() {
        assert_eq!(
            classify("en-US-ShdowNeural", true, false),
            Some(VoiceCategory::Neural)
        );
    }

    #[test]
    fn selects_neural_voices_in_locale_sorted_by_display_name() {
        let remote = vec![
            remote_voice("en-US-GuyRUS", "Guy", "Standard"),
            remote_voice("en-US-TonyNeural", "Tony", "Neural"),
            remote_voice("fr-FR-DeniseNeural", "Denise", "Neural"),
            remote_voice("en-AU-annetteNeural", "annette", "Neural"),
            remote_voice("en-GB-BellaNeural", "Bella", "Neural"),
        ];
        let voices = select_voices(remote, "en-");
        let names: Vec<_> = voices.iter().map(|v| v.display_name.as_str()).collect();
        assert_eq!(names, vec!["annette", "Bella", "Tony"]);
        assert!(voices.iter().all(|v| v.voice_type == VoiceType::Neural));
    }

    #[test]
    fn accented_names_sort_with_their_base_letter() {
        let remote = vec![
            remote_voice("en-US-ZoeNeural", "Zoe", "Neural"),
            remote_voice("en-GB-EliseNeural", "Élise", "Neural"),
            remote_voice("en-US-FredNeural", "Fred", "Neural"),
            remote_voice("en-CA-EliseNeural", "Elise", "Neural"),
            remote_voice("en-IE-EliseNeural", "elise", "Neural"),
        ];
        let voices = select_voices(remote, "en-");
        let names: Vec<_> = voices.iter().map(|v| v.display_name.as_str()).collect();
        assert_eq!(names, vec!["Elise", "elise", "Élise", "Fred", "Zoe"]);
    }

    #[test]
    fn empty_style_list_becomes_none() {
        let mut remote = remote_voice("en-US-EricNeural", "Eric", "Neural");
        remote.style_list = Some(Vec::new());
        remote.gender = "Male".to_string();
        let voice = VoiceDescriptor::from_remote(remote).expect("neural voice");
        assert_eq!(voice.style_list, None);
        assert!(!voice.has_styles());
        assert_eq!(voice.option_label(), "Eric (Male)");
    }

    fn quick_params() -> CatalogParams {
        CatalogParams {
            retry_delay: Duration::ZERO,
            ..Default::default()
        }
    }

    fn styled_voices() -> Vec<crate::engines::azure::client::RemoteVoice> {
        let mut jenny = remote_voice("en-US-JennyNeural", "Jenny", "Neural");
        jenny.style_list = Some(vec!["cheerful".to_string(), "sad".to_string()]);
        vec![
            jenny,
            remote_voice("en-US-AndrewMultilingualNeural", "Andrew", "Neural"),
            remote_voice("en-US-EricNeural", "Eric", "Neural"),
        ]
    }

    fn catalog(backend: &Arc<FakeBackend>, params: CatalogParams) -> VoiceCatalog<AzureEngine> {
        let engine = AzureEngine::with_backend(AzureConfig::with_key("k", "eastus"), backend.clone());
        VoiceCatalog::with_params(Arc::new(engine), params)
    }

    #[tokio::test]
    async fn caches_within_staleness_window() {
        let backend = Arc::new(FakeBackend::with_voices(styled_voices()));
        let catalog = catalog(&backend, quick_params());

        let first = catalog.voices().await.expect("voices");
        let second = catalog.voices().await.expect("cached voices");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(backend.opened.load(AtomicOrdering::SeqCst), 1);
    }

    #[tokio::test]
    async fn refetches_when_stale_or_invalidated() {
        let backend = Arc::new(FakeBackend::with_voices(styled_voices()));
        backend.push_voices(Ok(VoicesResult {
            voices: styled_voices(),
            error_details: None,
        }));
        backend.push_voices(Ok(VoicesResult {
            voices: styled_voices(),
            error_details: None,
        }));
        let catalog = catalog(
            &backend,
            CatalogParams {
                stale_after: Duration::ZERO,
                ..quick_params()
            },
        );

        catalog.voices().await.expect("first fetch");
        catalog.voices().await.expect("stale refetch");
        assert_eq!(backend.opened.load(AtomicOrdering::SeqCst), 2);

        catalog.invalidate().await;
        catalog.voices().await.expect("refetch after invalidate");
        assert_eq!(backend.opened.load(AtomicOrdering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retries_failed_fetch_twice() {
        let backend = Arc::new(FakeBackend::default());
        backend.push_voices(Err("timeout".to_string()));
        backend.push_voices(Err("timeout".to_string()));
        backend.push_voices(Ok(VoicesResult {
            voices: styled_voices(),
            error_details: None,
        }));
        let catalog = catalog(&backend, quick_params());

        let voices = catalog.voices().await.expect("third attempt succeeds");
        assert_eq!(voices.len(), 3);
        assert_eq!(backend.opened.load(AtomicOrdering::SeqCst), 3);
        assert_eq!(backend.closed.load(AtomicOrdering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_retries() {
        let backend = Arc::new(FakeBackend::default());
        for _ in 0..3 {
            backend.push_voices(Ok(VoicesResult {
                voices: Vec::new(),
                error_details: Some("HTTP 503".to_string()),
            }));
        }
        let catalog = catalog(&backend, quick_params());

        match catalog.voices().await {
            Err(AzureError::Remote(message)) => assert_eq!(message, "HTTP 503"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(backend.opened.load(AtomicOrdering::SeqCst), 3);
    }

    #[tokio::test]
    async fn unconfigured_catalog_never_fetches() {
        let backend = Arc::new(FakeBackend::with_voices(styled_voices()));
        let engine = AzureEngine::with_backend(AzureConfig::default(), backend.clone());
        let catalog = VoiceCatalog::new(Arc::new(engine));

        assert!(matches!(
            catalog.voices().await,
            Err(AzureError::NotConfigured)
        ));
        assert_eq!(backend.opened.load(AtomicOrdering::SeqCst), 0);
    }

    #[tokio::test]
    async fn filters_by_category_and_lists_styles() {
        let backend = Arc::new(FakeBackend::with_voices(styled_voices()));
        let catalog = catalog(&backend, quick_params());

        let neural = catalog
            .by_category(VoiceCategory::Neural)
            .await
            .expect("voices");
        let names: Vec<_> = neural.iter().map(|v| v.short_name.as_str()).collect();
        assert_eq!(names, vec!["en-US-EricNeural", "en-US-JennyNeural"]);

        let multilingual = catalog
            .by_category(VoiceCategory::Multilingual)
            .await
            .expect("voices");
        assert_eq!(multilingual.len(), 1);
        assert!(catalog
            .by_category(VoiceCategory::NeuralHD)
            .await
            .expect("voices")
            .is_empty());

        assert_eq!(
            catalog.styles_for("en-US-JennyNeural").await.expect("styles"),
            vec!["default", "cheerful", "sad"]
        );
        assert!(catalog
            .styles_for("en-US-EricNeural")
            .await
            .expect("styles")
            .is_empty());
        assert_eq!(backend.opened.load(AtomicOrdering::SeqCst), 1);
    }
}
