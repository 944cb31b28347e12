use serde::Serialize;

/// Upper bound for a pretty-printed payload in one log event. Sales history pages get large.
const PRETTY_JSON_MAX_CHARS: usize = 16 * 1024;

/// Pretty-prints `value` and hands it to `log_action`, only when DEBUG is enabled.
pub(crate) fn with_pretty_json_debug<T, F>(value: &T, log_action: F)
where
    T: Serialize,
    F: FnOnce(&str),
{
    if !tracing::enabled!(tracing::Level::DEBUG) {
        return;
    }

    let pretty_json = serde_json::to_string_pretty(value)
        .unwrap_or_else(|error| format!("<pretty serialize failed: {error}>"));
    log_action(truncate_chars(&pretty_json, PRETTY_JSON_MAX_CHARS).as_ref());
}

/// First `max_chars` characters of `text`, with a marker when something was cut.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> std::borrow::Cow<'_, str> {
    match text.char_indices().nth(max_chars) {
        None => text.into(),
        Some((cut, _)) => format!("{}…<{} bytes omitted>", &text[..cut], text.len() - cut).into(),
    }
}
