// src/utils/html.rs

/// Cleans user-supplied text with ammonia's whitelist.
///
/// Safe tags (`<b>`, `<p>`, ...) survive; `<script>`, `<iframe>` and event
/// handler attributes are stripped.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

/// [`clean_html`] over an optional field.
pub fn clean_opt(input: Option<String>) -> Option<String> {
    input.map(|s| clean_html(&s))
}

/// [`clean_opt`] for required fields: text that sanitizes to nothing is absent.
pub fn clean_filled(input: Option<String>) -> Option<String> {
    clean_opt(input).filter(|s| !s.trim().is_empty())
}
