use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use azure_tts_rs::{
    display::{format_duration, setup_instructions, style_display_name, truncate_text, SAMPLE_TEXTS},
    engines::azure::{AzureConfig, AzureEngine, SynthesisRequest, VoiceCatalog, VoiceCategory},
    session::{SynthesisSession, SynthesisStatus},
    SynthesisEngine, DEFAULT_DOWNLOAD_NAME,
};

/// Usage: `cargo run --example azure -- [voice-short-name] [style] [text...]`
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let engine = Arc::new(AzureEngine::new(AzureConfig::from_env()));
    if !engine.is_configured() {
        println!("{}", setup_instructions());
        return Ok(());
    }

    let catalog = VoiceCatalog::new(engine.clone());
    let load_start = Instant::now();
    let voices = catalog.voices().await?;
    println!("Loaded {} voices in {:.2?}", voices.len(), load_start.elapsed());
    for category in VoiceCategory::ALL {
        let count = voices.iter().filter(|v| v.category == category).count();
        println!("  {:<13} {count}", category.label());
    }

    let mut args = env::args().skip(1);
    let voice = match args.next() {
        Some(name) => name,
        None => catalog
            .by_category(VoiceCategory::Neural)
            .await?
            .first()
            .map(|v| v.short_name.clone())
            .ok_or("no neural voices available")?,
    };
    let style = args.next();
    let text: Vec<String> = args.collect();
    let text = if text.is_empty() {
        SAMPLE_TEXTS[0].to_string()
    } else {
        text.join(" ")
    };

    let styles = catalog.styles_for(&voice).await?;
    if !styles.is_empty() {
        let labels: Vec<String> = styles.iter().map(|s| style_display_name(s)).collect();
        println!("Styles for {voice}: {}", labels.join(", "));
    }

    let mut builder = SynthesisRequest::builder();
    builder.text(text.as_str()).voice_short_id(voice.as_str());
    if let Some(style) = style {
        builder.style(style);
    }
    let request = builder.build()?;

    println!("Speaking \"{}\" with {voice}", truncate_text(&request.text, 50));
    let mut session = SynthesisSession::new();
    let synth_start = Instant::now();
    match session.run(engine.as_ref(), &request).await {
        SynthesisStatus::Success => {
            println!(
                "Synthesized {} of audio in {:.2?}",
                format_duration(session.duration_ms()),
                synth_start.elapsed()
            );
            let path = PathBuf::from(DEFAULT_DOWNLOAD_NAME);
            session.download(Some(&path))?;
            println!("Saved to {}", path.display());
        }
        _ => {
            eprintln!("Error: {}", session.error().unwrap_or("Synthesis failed"));
        }
    }

    session.reset();
    Ok(())
}
