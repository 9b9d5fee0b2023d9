use time::format_description::well_known::Rfc3339;

pub fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

const MAX_BODY_SNIPPET: usize = 200;

/// Trims an error body for inclusion in a message.
pub fn shorten_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.len() <= MAX_BODY_SNIPPET {
        return trimmed.to_string();
    }
    let mut end = MAX_BODY_SNIPPET;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &trimmed[..end])
}
