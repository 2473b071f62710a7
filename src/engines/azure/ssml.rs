use std::borrow::Cow;

use super::engine::SynthesisRequest;

/// Style value that means "no expressive style".
pub const DEFAULT_STYLE: &str = "default";

/// Pitch and rate value that leaves prosody unchanged.
pub const DEFAULT_PROSODY: &str = "default";

const SYNTHESIS_NS: &str = "http://www.w3.org/2001/10/synthesis";
const MSTTS_NS: &str = "https://www.w3.org/2001/mstts";
const XML_LANG: &str = "en-US";

/// Escape the five XML metacharacters.
///
/// Borrows the input unchanged when there is nothing to escape.
pub fn escape_xml(input: &str) -> Cow<'_, str> {
    if !input.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len() + 16);
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    Cow::Owned(out)
}

/// Build the SSML document for a synthesis request.
///
/// The text is always wrapped in a `prosody` element. When the request carries
/// a style other than [`DEFAULT_STYLE`], the prosody element is wrapped in
/// `mstts:express-as`. Voice and style names are forwarded as given; the
/// service decides whether they exist.
pub fn build_payload(request: &SynthesisRequest) -> String {
    let prosody = format!(
        r#"<prosody pitch="{}" rate="{}">{}</prosody>"#,
        escape_xml(&request.pitch),
        escape_xml(&request.rate),
        escape_xml(&request.text),
    );
    let voice = escape_xml(&request.voice_short_id);

    match request.expressive_style() {
        Some(style) => format!(
            r#"<speak version="1.0" xmlns="{SYNTHESIS_NS}" xmlns:mstts="{MSTTS_NS}" xml:lang="{XML_LANG}"><voice name="{voice}"><mstts:express-as style="{}" styledegree="{}">{prosody}</mstts:express-as></voice></speak>"#,
            escape_xml(style),
            request.style_degree,
        ),
        None => format!(
            r#"<speak version="1.0" xmlns="{SYNTHESIS_NS}" xml:lang="{XML_LANG}"><voice name="{voice}">{prosody}</voice></speak>"#
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::{build_payload, escape_xml};
    use crate::engines::azure::SynthesisRequest;
    use std::borrow::Cow;

    #[test]
    fn escapes_all_metacharacters() {
        assert_eq!(
            escape_xml(r#"Tom & Jerry <3 "quotes" 'single'"#),
            "Tom &amp; Jerry &lt;3 &quot;quotes&quot; &apos;single&apos;"
        );
    }

    #[test]
    fn borrows_clean_input() {
        assert!(matches!(escape_xml("plain text"), Cow::Borrowed(_)));
    }

    #[test]
    fn payload_without_style_has_prosody_only() {
        let request = SynthesisRequest::new("Hello there", "en-US-JennyNeural");
        let ssml = build_payload(&request);
        assert_eq!(
            ssml,
            r#"<speak version="1.0" xmlns="http://www.w3.org/2001/10/synthesis" xml:lang="en-US"><voice name="en-US-JennyNeural"><prosody pitch="default" rate="default">Hello there</prosody></voice></speak>"#
        );
        assert!(!ssml.contains("express-as"));
        assert!(!ssml.contains("xmlns:mstts"));
    }

    #[test]
    fn payload_with_style_wraps_prosody() {
        let request = SynthesisRequest::builder()
            .text("Great news!")
            .voice_short_id("en-US-AriaNeural")
            .style("cheerful")
            .style_degree(1.5)
            .rate("+10%")
            .build()
            .expect("valid request");
        let ssml = build_payload(&request);
        assert!(ssml.contains(r#"xmlns:mstts="https://www.w3.org/2001/mstts""#));
        assert!(ssml.contains(
            r#"<mstts:express-as style="cheerful" styledegree="1.5"><prosody pitch="default" rate="+10%">Great news!</prosody></mstts:express-as>"#
        ));
    }

    #[test]
    fn default_style_sentinel_is_ignored() {
        let request = SynthesisRequest::builder()
            .text("Plain")
            .voice_short_id("en-US-AriaNeural")
            .style("default")
            .build()
            .expect("valid request");
        assert!(!build_payload(&request).contains("express-as"));
    }

    #[test]
    fn empty_style_is_ignored() {
        let request = SynthesisRequest::builder()
            .text("Plain")
            .voice_short_id("en-US-AriaNeural")
            .style("")
            .build()
            .expect("valid request");
        assert_eq!(request.expressive_style(), None);
        let ssml = build_payload(&request);
        assert!(!ssml.contains("express-as"), "{ssml}");
        assert!(!ssml.contains("xmlns:mstts"), "{ssml}");
    }

    #[test]
    fn style_degree_defaults_to_one() {
        let request = SynthesisRequest::builder()
            .text("Calm down")
            .voice_short_id("en-US-AriaNeural")
            .style("calm")
            .build()
            .expect("valid request");
        assert!(build_payload(&request).contains(r#"styledegree="1""#));
    }

    #[test]
    fn payload_has_no_unescaped_user_metacharacters() {
        let request = SynthesisRequest::new(r#"if a < b && c > "d" then 'e'"#, "en-US-GuyNeural");
        let ssml = build_payload(&request);
        let start = ssml.find(r#"rate="default">"#).expect("prosody open") + r#"rate="default">"#.len();
        let end = ssml.find("</prosody>").expect("prosody close");
        let body = &ssml[start..end];
        assert!(!body.contains('<'));
        assert!(!body.contains('>'));
        assert!(!body.contains('"'));
        assert!(!body.contains('\''));
        assert_eq!(body.matches('&').count(), body.matches(';').count());
        assert_eq!(
            body,
            "if a &lt; b &amp;&amp; c &gt; &quot;d&quot; then &apos;e&apos;"
        );
    }
}
