//! Scrubbing of captured backend output before it reaches a log line.
//!
//! Backend tools write whatever they like to their combined output; before
//! any of it lands in an audit line it is reduced to printable ASCII and
//! stripped of the known `extra fields` chatter some verifiers append after
//! the interesting part of their verdict.

/// Marker after which backend output is discarded.
const EXTRA_FIELDS_MARKER: &str = "extra fields";

/// Replace every byte outside the printable ASCII range (space through `~`)
/// with a space. Total function; the output contains only bytes 32..=126.
pub fn sanitize(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| if (32..=126).contains(&b) { b as char } else { ' ' })
        .collect()
}

/// Truncate `text` just before the `extra fields` marker, dropping the one
/// separating character preceding it as well. Text without the marker is
/// returned unchanged. Total function on any `&str`; the separator is
/// removed as a character, not a byte, so a multibyte character before the
/// marker cannot split mid-sequence.
pub fn strip_extra_fields(text: &str) -> &str {
    match text.find(EXTRA_FIELDS_MARKER) {
        Some(pos) => {
            let head = &text[..pos];
            match head.char_indices().last() {
                Some((sep, _)) => &head[..sep],
                None => head,
            }
        }
        None => text,
    }
}

/// Full scrub applied to drained backend output: byte sanitization followed
/// by marker truncation. Idempotent, so re-applying it to an already clean
/// line changes nothing.
pub fn sanitize_backend_output(bytes: &[u8]) -> String {
    let clean = sanitize(bytes);
    strip_extra_fields(&clean).to_string()
}
