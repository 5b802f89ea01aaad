//! Display-language resolution

/// Raw language value meaning "follow the system locale"
pub const LANG_SYSTEM: &str = "sys";
pub const LANG_ENGLISH: &str = "en";
pub const LANG_FRENCH: &str = "fr";

const SUPPORTED_LANGUAGES: [&str; 2] = [LANG_ENGLISH, LANG_FRENCH];

/// Whether `language` is one the UI ships translations for
#[must_use]
pub fn is_supported(language: &str) -> bool {
    SUPPORTED_LANGUAGES.contains(&language)
}

/// Resolve the language the UI should actually render in.
///
/// `system_locale` is a BCP 47 tag such as `fr-FR`; only its primary subtag
/// is considered.
#[must_use]
pub fn computed_language(language: &str, system_locale: &str) -> String {
    if language == LANG_SYSTEM {
        let primary = system_locale
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        if is_supported(&primary) {
            return primary;
        }
        return LANG_ENGLISH.to_string();
    }

    if is_supported(language) {
        language.to_string()
    } else {
        LANG_ENGLISH.to_string()
    }
}
