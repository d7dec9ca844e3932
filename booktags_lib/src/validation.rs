use crate::error::BookTagsError;

pub const MAX_TOPIC_LENGTH: usize = 100;
pub const MAX_PAGES_LIMIT: u32 = 100;

/// Strip control characters, trim whitespace, and enforce a byte-length limit.
pub fn sanitize_text(input: &str, max_len: usize) -> Result<String, BookTagsError> {
    if input.len() > max_len {
        return Err(BookTagsError::InvalidInput(format!(
            "input exceeds maximum length of {} bytes",
            max_len
        )));
    }
    let sanitized: String = input
        .chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .trim()
        .to_string();
    if sanitized.is_empty() {
        return Err(BookTagsError::InvalidInput(
            "input is empty after sanitization".to_string(),
        ));
    }
    Ok(sanitized)
}

/// Validate a single tag name.
pub fn validate_topic(input: &str) -> Result<String, BookTagsError> {
    sanitize_text(input, MAX_TOPIC_LENGTH)
        .map_err(|e| BookTagsError::InvalidInput(format!("tag {:?}: {}", input, invalid_reason(e))))
}

/// Validate the tag list: each tag individually, duplicates dropped in
/// order, at least one required.
pub fn validate_topics<S: AsRef<str>>(inputs: &[S]) -> Result<Vec<String>, BookTagsError> {
    let mut topics: Vec<String> = Vec::with_capacity(inputs.len());
    for input in inputs {
        let topic = validate_topic(input.as_ref())?;
        if !topics.contains(&topic) {
            topics.push(topic);
        }
    }
    if topics.is_empty() {
        return Err(BookTagsError::InvalidInput(
            "at least one tag is required".to_string(),
        ));
    }
    Ok(topics)
}

/// Validate max pages per tag (must be 1..=100).
pub fn validate_max_pages(max_pages: u32) -> Result<u32, BookTagsError> {
    if !(1..=MAX_PAGES_LIMIT).contains(&max_pages) {
        return Err(BookTagsError::InvalidInput(format!(
            "max_pages must be between 1 and {}",
            MAX_PAGES_LIMIT
        )));
    }
    Ok(max_pages)
}

fn invalid_reason(e: BookTagsError) -> String {
    match e {
        BookTagsError::InvalidInput(msg) => msg,
        other => other.to_string(),
    }
}
