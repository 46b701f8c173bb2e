//! Offset pagination with an opaque cursor.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct CursorPayload {
    offset: usize,
}

pub fn encode_cursor(offset: usize) -> String {
    let payload = serde_json::to_vec(&CursorPayload { offset }).unwrap_or_default();
    URL_SAFE_NO_PAD.encode(payload)
}

/// Decodes a cursor to its offset. Missing, malformed or foreign cursors mean offset 0.
pub fn decode_cursor(cursor: Option<&str>) -> usize {
    cursor
        .and_then(|raw| URL_SAFE_NO_PAD.decode(raw.trim().trim_end_matches('=')).ok())
        .and_then(|bytes| serde_json::from_slice::<CursorPayload>(&bytes).ok())
        .map(|payload| payload.offset)
        .unwrap_or(0)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub offset: usize,
    pub total: usize,
    pub has_more: bool,
    pub next_cursor: Option<String>,
}

/// Slices `[offset, offset + max)`; a cursor is emitted only if items remain after the slice.
pub fn paginate<T>(items: Vec<T>, max: usize, cursor: Option<&str>) -> Page<T> {
    let total = items.len();
    let offset = decode_cursor(cursor).min(total);
    let end = offset.saturating_add(max.max(1)).min(total);
    let has_more = end < total;

    Page {
        items: items.into_iter().skip(offset).take(end - offset).collect(),
        offset,
        total,
        has_more,
        next_cursor: has_more.then(|| encode_cursor(end)),
    }
}
