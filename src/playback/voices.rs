//! Local voice selection and per-language speech rates

/// Perceived quality tier of a local synthesis voice
///
/// Platforms routinely install several engines for the same language;
/// ordering is derive-based so `max_by_key` picks the best one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum VoiceQuality {
    /// Robotic formant engines
    Low,
    /// Default system voices
    Standard,
    /// Neural / premium voices
    High,
}

/// One installed local synthesis voice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalVoice {
    /// Engine-specific identifier
    pub id: String,
    /// BCP-47-ish language tag, e.g. "en-US"
    pub language: String,
    /// Quality tier
    pub quality: VoiceQuality,
}

/// Default speech rate per language; languages with denser phonology get
/// a slower default so synthesized speech stays intelligible
const DEFAULT_RATES: &[(&str, f32)] = &[
    ("en", 1.0),
    ("es", 0.95),
    ("fr", 0.95),
    ("de", 0.95),
    ("ja", 0.9),
    ("zh", 0.9),
    ("hi", 0.85),
    ("ta", 0.8),
    ("te", 0.8),
    ("kn", 0.8),
];

/// Remote voice identifier per language
const REMOTE_VOICES: &[(&str, &str)] = &[
    ("en", "alloy"),
    ("es", "nova"),
    ("fr", "shimmer"),
    ("de", "onyx"),
    ("hi", "fable"),
    ("ja", "echo"),
];

/// Primary language subtag, lowercased ("en-US" -> "en", "english" ->
/// "english")
#[must_use]
pub fn primary_subtag(language_tag: &str) -> String {
    language_tag
        .split(['-', '_'])
        .next()
        .unwrap_or(language_tag)
        .to_lowercase()
}

/// Default speech rate for a language tag
#[must_use]
pub fn rate_for_language(language_tag: &str) -> f32 {
    let primary = primary_subtag(language_tag);
    DEFAULT_RATES
        .iter()
        .find(|(prefix, _)| primary.starts_with(prefix))
        .map_or(1.0, |(_, rate)| *rate)
}

/// Remote voice identifier for a language tag, or `default` if unmapped
#[must_use]
pub fn remote_voice_for<'a>(language_tag: &str, default: &'a str) -> &'a str {
    let primary = primary_subtag(language_tag);
    REMOTE_VOICES
        .iter()
        .find(|(prefix, _)| primary.starts_with(prefix))
        .map_or(default, |(_, voice)| voice)
}

/// Pick the best local voice for a language tag: language-prefix matches
/// ranked by quality, then any voice ranked by quality. `None` only when
/// the list is empty.
#[must_use]
pub fn select_voice<'a>(voices: &'a [LocalVoice], language_tag: &str) -> Option<&'a LocalVoice> {
    let primary = primary_subtag(language_tag);

    let matching = voices
        .iter()
        .filter(|v| {
            let voice_primary = primary_subtag(&v.language);
            voice_primary.starts_with(&primary) || primary.starts_with(&voice_primary)
        })
        .max_by_key(|v| v.quality);

    matching.or_else(|| voices.iter().max_by_key(|v| v.quality))
}
