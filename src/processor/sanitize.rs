//! Output cleanup applied to every generated reply

/// Phrases the model echoes from its instructions; everything from the first
/// occurrence onward is dropped
pub const LEAKAGE_PHRASES: [&str; 5] = [
    "Please provide the actual text",
    "Is there anything else I can assist you with?",
    "Please let me know if you need further assistance.",
    "Based on your owner's profile",
    "Please provide a concise and accurate response based on the information provided.",
];

/// Emoji and pictographic symbol blocks
const PICTOGRAPHIC_RANGES: [(u32, u32); 9] = [
    (0x1F600, 0x1F64F), // emoticons
    (0x1F300, 0x1F5FF), // symbols & pictographs
    (0x1F680, 0x1F6FF), // transport & map
    (0x1F1E0, 0x1F1FF), // flags
    (0x1F900, 0x1F9FF), // supplemental symbols & pictographs
    (0x1FA70, 0x1FAFF), // symbols & pictographs extended-a
    (0x2600, 0x27BF),   // misc symbols, dingbats
    (0x1F004, 0x1F251), // enclosed alphanumerics & ideographics
    (0xFE0F, 0xFE0F),   // emoji presentation selector
];

fn is_pictographic(c: char) -> bool {
    let cp = u32::from(c);
    PICTOGRAPHIC_RANGES
        .iter()
        .any(|&(start, end)| (start..=end).contains(&cp))
}

/// Strip pictographic symbols, then cut at the first leakage phrase
///
/// Idempotent: the result contains neither, so a second pass is a no-op.
#[must_use]
pub fn sanitize(response: &str) -> String {
    let stripped: String = response.chars().filter(|&c| !is_pictographic(c)).collect();

    let cut = LEAKAGE_PHRASES
        .iter()
        .filter_map(|phrase| stripped.find(phrase))
        .min();

    match cut {
        Some(idx) => {
            tracing::debug!(at = idx, "dropping echoed instructions");
            stripped[..idx].trim().to_string()
        }
        None => stripped,
    }
}

/// Bound a reply to `max_chars` characters, ending in "..." when cut
#[must_use]
pub fn truncate_response(response: &str, max_chars: usize) -> String {
    if response.chars().count() <= max_chars {
        return response.to_string();
    }

    let keep = max_chars.saturating_sub(3);
    let mut truncated: String = response.chars().take(keep).collect();
    truncated.push_str("...");
    tracing::warn!(max_chars, "response truncated to bound speech length");
    truncated
}
