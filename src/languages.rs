//! Catalog of target languages offered to clients.
//!
//! Display names are what clients submit; codes are what the translation
//! provider expects.

use crate::error::{JsonTranslatorError, Result};

const LANGUAGES: &[(&str, &str)] = &[
    ("Afrikaans", "af"),
    ("Albanian", "sq"),
    ("Arabic", "ar"),
    ("Armenian", "hy"),
    ("Azerbaijani", "az"),
    ("Basque", "eu"),
    ("Belarusian", "be"),
    ("Bengali", "bn"),
    ("Bulgarian", "bg"),
    ("Catalan", "ca"),
    ("Chinese (Simp)", "zh-CN"),
    ("Chinese (Trad)", "zh-TW"),
    ("Croatian", "hr"),
    ("Czech", "cs"),
    ("Danish", "da"),
    ("Dutch", "nl"),
    ("English", "en"),
    ("Estonian", "et"),
    ("Filipino", "tl"),
    ("Finnish", "fi"),
    ("French", "fr"),
    ("Galician", "gl"),
    ("Georgian", "ka"),
    ("German", "de"),
    ("Greek", "el"),
    ("Gujarati", "gu"),
    ("Haitian Creole", "ht"),
    ("Hebrew", "iw"),
    ("Hindi", "hi"),
    ("Hungarian", "hu"),
    ("Icelandic", "is"),
    ("Indonesian", "id"),
    ("Irish", "ga"),
    ("Italian", "it"),
    ("Japanese", "ja"),
    ("Kannada", "kn"),
    ("Korean", "ko"),
    ("Latvian", "lv"),
    ("Lithuanian", "lt"),
    ("Macedonian", "mk"),
    ("Malay", "ms"),
    ("Maltese", "mt"),
    ("Norwegian", "no"),
    ("Persian", "fa"),
    ("Polish", "pl"),
    ("Portuguese", "pt"),
    ("Romanian", "ro"),
    ("Russian", "ru"),
    ("Serbian", "sr"),
    ("Slovak", "sk"),
    ("Slovenian", "sl"),
    ("Spanish", "es"),
    ("Swahili", "sw"),
    ("Swedish", "sv"),
    ("Tamil", "ta"),
    ("Telugu", "te"),
    ("Thai", "th"),
    ("Turkish", "tr"),
    ("Ukrainian", "uk"),
    ("Urdu", "ur"),
    ("Vietnamese", "vi"),
    ("Welsh", "cy"),
    ("Yiddish", "yi"),
];

/// A resolved catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    pub name: &'static str,
    pub code: &'static str,
}

impl Language {
    /// Look up a language by its display name (exact match).
    pub fn from_name(name: &str) -> Result<Self> {
        LANGUAGES
            .iter()
            .find(|(n, _)| *n == name)
            .map(|&(name, code)| Language { name, code })
            .ok_or_else(|| JsonTranslatorError::UnknownLanguage(name.to_string()))
    }

    /// Tag used in artifact metadata and download file names: `zh-CN` → `ZH_CN`.
    pub fn tag(&self) -> String {
        normalize_tag(self.code)
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.code)
    }
}

pub fn normalize_tag(code: &str) -> String {
    code.to_uppercase().replace('-', "_")
}

pub fn count() -> usize {
    LANGUAGES.len()
}

/// Display names in alphabetical order.
pub fn names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = LANGUAGES.iter().map(|(n, _)| *n).collect();
    names.sort_unstable();
    names
}
