//! Tag columns stored as JSON-encoded string arrays.
//!
//! `business_type` and `room_type` hold several tags in one TEXT column,
//! e.g. `["whole_rent","shared_rent"]`. Filters match a single tag with
//! `LIKE '%"tag"%'` against the serialized form, see [`tag_pattern`].

/// Serialize tags for storage. Blank tags are dropped.
pub fn encode_tag_array(tags: &[String]) -> String {
    let cleaned: Vec<&str> = tags
        .iter()
        .map(|tag| tag.trim())
        .filter(|tag| !tag.is_empty())
        .collect();

    // Serializing a Vec<&str> cannot fail.
    serde_json::to_string(&cleaned).unwrap_or_else(|_| "[]".to_string())
}

/// Deserialize a stored tag column.
///
/// Legacy rows may contain a bare value or a comma-separated list instead
/// of a JSON array; both are accepted.
pub fn decode_tag_array(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Vec::new();
    };

    if let Ok(tags) = serde_json::from_str::<Vec<String>>(raw) {
        return tags;
    }

    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

/// LIKE pattern matching one tag inside a serialized tag array.
pub fn tag_pattern(tag: &str) -> String {
    format!("%\"{}\"%", tag)
}
