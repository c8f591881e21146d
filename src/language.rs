/// Language codes accepted on the command line and their English display names
const LANGUAGES: &[(&str, &str)] = &[
    ("en", "English"),
    ("zh-CN", "Simplified Chinese"),
    ("zh-Hans", "Simplified Chinese"),
    ("zh-TW", "Traditional Chinese"),
    ("zh-Hant", "Traditional Chinese"),
    ("zh", "Chinese"),
    ("ja", "Japanese"),
    ("ko", "Korean"),
    ("fr", "French"),
    ("de", "German"),
    ("es", "Spanish"),
    ("ru", "Russian"),
    ("it", "Italian"),
    ("pt", "Portuguese"),
    ("pl", "Polish"),
    ("nl", "Dutch"),
    ("tr", "Turkish"),
    ("ar", "Arabic"),
    ("hi", "Hindi"),
    ("th", "Thai"),
    ("vi", "Vietnamese"),
    ("id", "Indonesian"),
    ("sv", "Swedish"),
    ("da", "Danish"),
    ("no", "Norwegian"),
    ("fi", "Finnish"),
    ("he", "Hebrew"),
    ("uk", "Ukrainian"),
    ("cs", "Czech"),
    ("el", "Greek"),
];

/// Display name for a language code; anything unknown (including names) is returned as given
pub fn display_name(language: &str) -> String {
    let language = language.trim();
    LANGUAGES
        .iter()
        .find(|(code, _)| code.eq_ignore_ascii_case(language))
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| language.to_string())
}

/// Code for a language given either as a code or as a display name
pub fn code_for(language: &str) -> Option<&'static str> {
    let language = language.trim();
    LANGUAGES
        .iter()
        .find(|(code, name)| code.eq_ignore_ascii_case(language) || name.eq_ignore_ascii_case(language))
        .map(|(code, _)| *code)
}

/// Primary subtag of a language code (`en-US` -> `en`)
pub fn primary_subtag(code: &str) -> &str {
    code.split(['-', '_']).next().unwrap_or(code)
}

/// Filesystem-safe tag used in translated file names
pub fn file_tag(language: &str) -> String {
    let base = code_for(language).map(str::to_string).unwrap_or_else(|| language.trim().to_string());
    let tag: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
        .collect();
    let tag = tag.trim_matches('-').to_string();
    if tag.is_empty() { "translated".to_string() } else { tag }
}
