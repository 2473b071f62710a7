//! Formatting helpers for front ends built on this crate.

/// Sample sentences offered when the user has not typed anything.
pub const SAMPLE_TEXTS: [&str; 4] = [
    "Welcome! I'm your friendly text-to-speech assistant. Try selecting different voices \
     and styles to hear how I can transform your words into natural-sounding speech.",
    "The quick brown fox jumps over the lazy dog. This classic pangram contains every letter \
     of the alphabet, making it perfect for testing voice clarity.",
    "Breaking news: Scientists have discovered a new species of singing bird in the Amazon \
     rainforest. The bird's melodious call has captivated researchers worldwide.",
    "Once upon a time, in a land far, far away, there lived a curious little robot who dreamed \
     of becoming a poet. Every night, under the starlit sky, it would compose verses about the \
     beauty of the digital world.",
];

const STYLE_NAMES: &[(&str, &str)] = &[
    ("default", "Default"),
    ("cheerful", "Cheerful"),
    ("sad", "Sad"),
    ("angry", "Angry"),
    ("fearful", "Fearful"),
    ("disgruntled", "Disgruntled"),
    ("serious", "Serious"),
    ("depressed", "Depressed"),
    ("embarrassed", "Embarrassed"),
    ("affectionate", "Affectionate"),
    ("gentle", "Gentle"),
    ("calm", "Calm"),
    ("envious", "Envious"),
    ("hopeful", "Hopeful"),
    ("lyrical", "Lyrical"),
    ("terrified", "Terrified"),
    ("shouting", "Shouting"),
    ("unfriendly", "Unfriendly"),
    ("whispering", "Whispering"),
    ("excited", "Excited"),
    ("friendly", "Friendly"),
    ("assistant", "Assistant"),
    ("newscast", "Newscast"),
    ("customerservice", "Customer Service"),
    ("chat", "Casual Chat"),
    ("newscast-casual", "Newscast Casual"),
    ("newscast-formal", "Newscast Formal"),
    ("narration-professional", "Professional Narration"),
    ("documentary-narration", "Documentary Narration"),
    ("sports-commentary", "Sports Commentary"),
    ("sports-commentary-excited", "Sports Excited"),
    ("poetry-reading", "Poetry Reading"),
    ("advertisement-upbeat", "Advertisement"),
];

/// Format milliseconds as `m:ss`.
pub fn format_duration(ms: f64) -> String {
    let seconds = (ms.max(0.0) / 1000.0).floor() as u64;
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Label for a style name.
///
/// Known styles use a fixed label; anything else gets its first letter
/// upper-cased and the dashes after it turned into spaces.
pub fn style_display_name(style: &str) -> String {
    if let Some((_, label)) = STYLE_NAMES.iter().find(|(key, _)| *key == style) {
        return (*label).to_string();
    }

    let mut chars = style.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.map(|c| if c == '-' { ' ' } else { c }))
            .collect(),
        None => String::new(),
    }
}

/// Shorten text to at most `max_len` characters, ending in `...` when cut.
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_len.saturating_sub(3)).collect();
    format!("{kept}...")
}

/// Shown instead of the synthesis form when no key is configured.
pub fn setup_instructions() -> &'static str {
    "Configuration required.\n\
     Set your Azure Speech Service credentials before running:\n\
     \n\
     \x20   export AZURE_SPEECH_KEY=your_key_here\n\
     \x20   export AZURE_SPEECH_REGION=eastus\n"
}
