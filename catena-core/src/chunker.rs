//! Document chunking
//!
//! Splits text into windows of BPE tokens (`cl100k_base`) so each chunk stays
//! within an embedding model's input budget. Consecutive windows may overlap.
//! Windows are cut only where a character ends, so a chunk never carries part
//! of a multi-byte character.

use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::sync::OnceLock;
use thiserror::Error;
use tiktoken_rs::CoreBPE;
use tracing::warn;

use crate::domain::params::{RawParams, filter_allowed};

pub const TEXT_SPLITTER: &str = "text_splitter";
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 0;

const SPLITTER_KEYS: &[&str] = &["chunk_size", "chunk_overlap"];

/// Document transformer selection as submitted by callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkerConfig {
    #[serde(default = "default_transformer")]
    pub transformer: String,
    #[serde(default)]
    pub parameters: RawParams,
}

fn default_transformer() -> String {
    TEXT_SPLITTER.to_string()
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            transformer: default_transformer(),
            parameters: RawParams::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ChunkerError {
    #[error("{0} is not a supported document transformer")]
    UnsupportedTransformer(String),

    #[error("failed to load tokenizer: {0}")]
    Tokenizer(String),
}

/// Validated splitter parameters; `chunk_overlap < chunk_size` always holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitterParams {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for SplitterParams {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl SplitterParams {
    /// Interprets raw parameters, coercing anything invalid to the defaults
    pub fn from_raw(raw: &RawParams) -> Self {
        let filtered = filter_allowed(TEXT_SPLITTER, raw, SPLITTER_KEYS);
        let read = |key: &str| -> Option<usize> {
            let value = filtered.get(key)?;
            let parsed = value.as_u64().and_then(|n| usize::try_from(n).ok());
            if parsed.is_none() {
                warn!("{} = {} is not a valid value, using default", key, value);
            }
            parsed
        };

        let chunk_size = read("chunk_size").unwrap_or(DEFAULT_CHUNK_SIZE);
        let chunk_overlap = read("chunk_overlap").unwrap_or(DEFAULT_CHUNK_OVERLAP);

        if chunk_size == 0 || chunk_overlap >= chunk_size {
            warn!(
                "chunk_size = {}, chunk_overlap = {} is not a valid window, using defaults",
                chunk_size, chunk_overlap
            );
            return Self::default();
        }

        Self {
            chunk_size,
            chunk_overlap,
        }
    }
}

/// Token ranges of each chunk, cut only at `boundaries`
///
/// `boundaries` is sorted, starts at 0 and ends at the token count. A window
/// grows to the last boundary within `chunk_size` tokens, or to the next one
/// when a single character needs more tokens than that.
pub fn window_ranges(boundaries: &[usize], params: SplitterParams) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let len = match boundaries.last() {
        Some(&len) if len > 0 => len,
        _ => return ranges,
    };

    let mut start = 0;
    loop {
        let end = last_at_most(boundaries, start + params.chunk_size)
            .filter(|&b| b > start)
            .or_else(|| first_after(boundaries, start))
            .unwrap_or(len);
        ranges.push(start..end);
        if end == len {
            break;
        }
        start = last_at_most(boundaries, end.saturating_sub(params.chunk_overlap))
            .filter(|&b| b > start)
            .unwrap_or(end);
    }
    ranges
}

fn last_at_most(boundaries: &[usize], limit: usize) -> Option<usize> {
    let idx = boundaries.partition_point(|&b| b <= limit);
    idx.checked_sub(1).map(|i| boundaries[i])
}

fn first_after(boundaries: &[usize], start: usize) -> Option<usize> {
    let idx = boundaries.partition_point(|&b| b <= start);
    boundaries.get(idx).copied()
}

static CL100K: OnceLock<CoreBPE> = OnceLock::new();

/// Process-wide `cl100k_base` encoder, built on first use
fn cl100k() -> Result<&'static CoreBPE, ChunkerError> {
    if let Some(bpe) = CL100K.get() {
        return Ok(bpe);
    }
    let bpe = tiktoken_rs::cl100k_base().map_err(|e| ChunkerError::Tokenizer(e.to_string()))?;
    Ok(CL100K.get_or_init(|| bpe))
}

/// Token-window text splitter
pub struct TextSplitter {
    params: SplitterParams,
    bpe: &'static CoreBPE,
}

impl std::fmt::Debug for TextSplitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextSplitter")
            .field("params", &self.params)
            .finish()
    }
}

impl TextSplitter {
    pub fn new(params: SplitterParams) -> Result<Self, ChunkerError> {
        Ok(Self {
            params,
            bpe: cl100k()?,
        })
    }

    /// Builds the splitter named by `config`
    pub fn from_config(config: &ChunkerConfig) -> Result<Self, ChunkerError> {
        if config.transformer != TEXT_SPLITTER {
            return Err(ChunkerError::UnsupportedTransformer(
                config.transformer.clone(),
            ));
        }
        Self::new(SplitterParams::from_raw(&config.parameters))
    }

    pub fn params(&self) -> SplitterParams {
        self.params
    }

    /// Chunks `text`; CPU-bound on large documents
    pub fn split(&self, text: &str) -> Vec<String> {
        let tokens = self.bpe.encode_ordinary(text);
        let boundaries = self.char_boundaries(&tokens);

        window_ranges(&boundaries, self.params)
            .into_iter()
            .filter_map(|range| match self.bpe.decode(tokens[range.clone()].to_vec()) {
                Ok(chunk) => Some(chunk),
                Err(e) => {
                    warn!("tokens {:?} do not decode: {}", range, e);
                    None
                }
            })
            .collect()
    }

    /// Token offsets at which a character ends, including 0 and the count
    fn char_boundaries(&self, tokens: &[usize]) -> Vec<usize> {
        let mut boundaries = vec![0];
        let mut last = 0;
        for end in 1..=tokens.len() {
            // Bytes up to `last` are whole characters, so this run decodes
            // exactly when `end` also falls between characters
            if self.bpe.decode(tokens[last..end].to_vec()).is_ok() {
                boundaries.push(end);
                last = end;
            }
        }
        if last < tokens.len() {
            boundaries.push(tokens.len());
        }
        boundaries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawParams {
        value.as_object().cloned().unwrap()
    }

    fn every_token(len: usize) -> Vec<usize> {
        (0..=len).collect()
    }

    #[test]
    fn test_window_ranges_without_overlap() {
        let params = SplitterParams {
            chunk_size: 4,
            chunk_overlap: 0,
        };
        assert_eq!(window_ranges(&every_token(10), params), vec![0..4, 4..8, 8..10]);
        assert_eq!(window_ranges(&every_token(4), params), vec![0..4]);
        assert!(window_ranges(&every_token(0), params).is_empty());
    }

    #[test]
    fn test_window_ranges_with_overlap() {
        let params = SplitterParams {
            chunk_size: 4,
            chunk_overlap: 1,
        };
        assert_eq!(window_ranges(&every_token(10), params), vec![0..4, 3..7, 6..10]);
    }

    #[test]
    fn test_window_ranges_respect_character_boundaries() {
        let params = SplitterParams {
            chunk_size: 2,
            chunk_overlap: 0,
        };
        // tokens 3..6 encode one character
        assert_eq!(
            window_ranges(&[0, 2, 3, 6, 7], params),
            vec![0..2, 2..3, 3..6, 6..7]
        );

        let params = SplitterParams {
            chunk_size: 3,
            chunk_overlap: 1,
        };
        assert_eq!(
            window_ranges(&[0, 1, 3, 4, 6], params),
            vec![0..3, 1..4, 3..6]
        );
    }

    #[test]
    fn test_params_from_raw() {
        let params = SplitterParams::from_raw(&raw(json!({"chunk_size": 200, "chunk_overlap": 20})));
        assert_eq!(params.chunk_size, 200);
        assert_eq!(params.chunk_overlap, 20);
    }

    #[test]
    fn test_params_missing_use_defaults() {
        assert_eq!(SplitterParams::from_raw(&RawParams::new()), SplitterParams::default());
    }

    #[test]
    fn test_params_invalid_window_coerced_to_defaults() {
        let params = SplitterParams::from_raw(&raw(json!({"chunk_size": 10, "chunk_overlap": 10})));
        assert_eq!(params, SplitterParams::default());

        let params = SplitterParams::from_raw(&raw(json!({"chunk_size": 0})));
        assert_eq!(params, SplitterParams::default());
    }

    #[test]
    fn test_params_unknown_and_mistyped_keys() {
        let params = SplitterParams::from_raw(&raw(json!({
            "chunk_size": "big",
            "chunk_overlap": 5,
            "separator": "\n"
        })));
        assert_eq!(params.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(params.chunk_overlap, 5);
    }

    #[test]
    fn test_unsupported_transformer() {
        let config = ChunkerConfig {
            transformer: "markdown".to_string(),
            parameters: RawParams::new(),
        };
        assert!(matches!(
            TextSplitter::from_config(&config),
            Err(ChunkerError::UnsupportedTransformer(name)) if name == "markdown"
        ));
    }

    #[test]
    fn test_split_is_bounded_and_deterministic() {
        let splitter = TextSplitter::new(SplitterParams {
            chunk_size: 8,
            chunk_overlap: 2,
        })
        .unwrap();
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(10);

        let chunks = splitter.split(&text);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(splitter.bpe.encode_ordinary(chunk).len() <= 8);
        }
        assert_eq!(chunks, splitter.split(&text));
    }

    #[test]
    fn test_split_without_overlap_reassembles_text() {
        let splitter = TextSplitter::new(SplitterParams {
            chunk_size: 5,
            chunk_overlap: 0,
        })
        .unwrap();
        let text = "Chunks without overlap concatenate back to the original input text.";

        assert_eq!(splitter.split(text).concat(), text);
    }

    #[test]
    fn test_split_keeps_multibyte_characters() {
        let splitter = TextSplitter::new(SplitterParams {
            chunk_size: 3,
            chunk_overlap: 0,
        })
        .unwrap();
        let text = "東京都の天気は晴れです。🦀 Rust は安全です。";

        let chunks = splitter.split(text);
        assert_eq!(chunks.concat(), text);
        assert!(chunks.iter().all(|c| !c.contains('\u{FFFD}')));
    }

    #[test]
    fn test_splitters_share_one_encoder() {
        let a = TextSplitter::new(SplitterParams::default()).unwrap();
        let b = TextSplitter::new(SplitterParams::default()).unwrap();
        assert!(std::ptr::eq(a.bpe, b.bpe));
    }

    #[test]
    fn test_split_empty_text() {
        let splitter = TextSplitter::new(SplitterParams::default()).unwrap();
        assert!(splitter.split("").is_empty());
    }
}
