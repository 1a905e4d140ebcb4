//! Wire formats for split requests and results.

use std::fmt::Write as _;

use serde::Deserialize;

use crate::split::ChunkResult;

/// A split request as received by the function handler.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitRequest {
    pub input_path: String,
    pub output_prefix: String,
    pub split_size_bytes: u64,
}

impl SplitRequest {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Serialise chunk results as a JSON array.
pub fn to_json(chunks: &[ChunkResult]) -> serde_json::Result<String> {
    serde_json::to_string(chunks)
}

/// Human-readable table, one line per chunk.
pub fn render_text(chunks: &[ChunkResult]) -> String {
    let width = chunks
        .iter()
        .map(|chunk| chunk.output_id.len())
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    for chunk in chunks {
        let _ = writeln!(
            out,
            "{:<width$}  {:>12} bytes  {:>10} ms",
            chunk.output_id, chunk.byte_size, chunk.duration_ms
        );
    }
    out
}
