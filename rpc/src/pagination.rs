//! Cursor-based pagination for list endpoints.
//!
//! A cursor is the base64 encoding of the decimal offset of the next item.
//! Clients must treat it as opaque.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u32 = 100;
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Query parameters accepted by list endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaginationParams {
    pub cursor: Option<String>,
    /// Items per page (default 100, max 1000).
    pub count: Option<u32>,
}

impl PaginationParams {
    /// Page size clamped to `[1, MAX_PAGE_SIZE]`.
    pub fn effective_count(&self) -> u32 {
        self.count
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    /// Offset named by the cursor, or `None` if a cursor was given but is garbage.
    pub fn offset(&self) -> Option<u64> {
        match self.cursor.as_deref() {
            None => Some(0),
            Some(cursor) => decode_cursor(cursor),
        }
    }
}

/// A page of items plus the cursor for the next one.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    /// Absent on the last page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, offset: u64, page_size: u32, total: u64) -> Self {
        let next_cursor = next_cursor(offset, items.len(), page_size, total);
        Self {
            items,
            total,
            next_cursor,
        }
    }
}

pub fn encode_cursor(offset: u64) -> String {
    base64_encode(offset.to_string().as_bytes())
}

pub fn decode_cursor(cursor: &str) -> Option<u64> {
    let bytes = base64_decode(cursor)?;
    std::str::from_utf8(&bytes).ok()?.parse::<u64>().ok()
}

/// Cursor following a page of `returned` items starting at `offset`, or
/// `None` when the page was short or reached `total`.
pub fn next_cursor(offset: u64, returned: usize, page_size: u32, total: u64) -> Option<String> {
    let end = offset.saturating_add(returned as u64);
    if (returned as u32) < page_size || end >= total {
        None
    } else {
        Some(encode_cursor(end))
    }
}

const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

fn base64_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len().div_ceil(3) * 4);
    for chunk in data.chunks(3) {
        let triple = chunk
            .iter()
            .enumerate()
            .fold(0u32, |acc, (i, &b)| acc | (b as u32) << (16 - 8 * i));
        for i in 0..4 {
            if i <= chunk.len() {
                let index = (triple >> (18 - 6 * i)) & 0x3F;
                out.push(ALPHABET[index as usize] as char);
            } else {
                out.push('=');
            }
        }
    }
    out
}

fn base64_decode(input: &str) -> Option<Vec<u8>> {
    let digits = input
        .trim_end_matches('=')
        .bytes()
        .map(|c| ALPHABET.iter().position(|&a| a == c).map(|v| v as u32))
        .collect::<Option<Vec<u32>>>()?;
    let mut out = Vec::with_capacity(digits.len() * 3 / 4);
    for chunk in digits.chunks(4) {
        if chunk.len() < 2 {
            return None;
        }
        let accum = chunk
            .iter()
            .enumerate()
            .fold(0u32, |acc, (i, &v)| acc | v << (18 - 6 * i));
        for i in 0..chunk.len() - 1 {
            out.push((accum >> (16 - 8 * i)) as u8);
        }
    }
    Some(out)
}
