//! Block segmentation — turn null-region boundaries into typed blocks.
//!
//! Every non-null span between separators becomes one [`Block`].  What a
//! block *is* comes from a [`BlockClassifier`]; the stock
//! [`OrdinalClassifier`] labels by position alone (first block Header, second
//! Definition, everything after Data), which is how BK writers lay files out.
//! A file that does not follow that layout is mis-labelled, not rejected.
//!
//! The text/binary flags and the hex prefix are diagnostics only; nothing
//! downstream decodes differently because of them.

pub mod scanner;

use std::fmt;

pub use scanner::{scan_null_regions, NullRegion, DEFAULT_NULL_THRESHOLD};

/// Number of leading bytes rendered into [`Block::signature_hex`].
pub const HEX_SIGNATURE_LEN: usize = 8;
/// Fraction of text-like bytes above which a block counts as text.
pub const TEXT_RATIO: f64 = 0.6;

// ── Types ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Header,
    Definition,
    Data,
    Unknown,
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            BlockKind::Header     => "Header",
            BlockKind::Definition => "Definition",
            BlockKind::Data       => "Data",
            BlockKind::Unknown    => "Unknown",
        })
    }
}

/// One contiguous non-null span.  `start` and `end` are inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub id:            usize,
    pub start:         usize,
    pub end:           usize,
    pub size:          usize,
    pub kind:          BlockKind,
    pub has_text:      bool,
    pub has_binary:    bool,
    pub signature_hex: String,
}

impl Block {
    /// Slice of `data` covered by this block.
    pub fn bytes<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        &data[self.start..=self.end]
    }
}

// ── Classification ────────────────────────────────────────────────────────────

/// Strategy deciding the kind of the `ordinal`-th emitted block.
pub trait BlockClassifier {
    fn classify(&self, ordinal: usize, bytes: &[u8]) -> BlockKind;
}

/// Position-only classification used by every known BK writer.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrdinalClassifier;

impl BlockClassifier for OrdinalClassifier {
    fn classify(&self, ordinal: usize, _bytes: &[u8]) -> BlockKind {
        match ordinal {
            0 => BlockKind::Header,
            1 => BlockKind::Definition,
            _ => BlockKind::Data,
        }
    }
}

// ── Content diagnostics ──────────────────────────────────────────────────────

fn is_text_byte(b: u8) -> bool {
    (32..=126).contains(&b) || matches!(b, b'\t' | b'\n' | b'\r')
}

/// More than 60% printable ASCII (plus tab/LF/CR).
pub fn has_text_content(data: &[u8]) -> bool {
    if data.is_empty() {
        return false;
    }
    let text = data.iter().filter(|&&b| is_text_byte(b)).count();
    text as f64 / data.len() as f64 > TEXT_RATIO
}

/// Any byte above 127, or a control byte other than tab/LF/CR/NUL.
pub fn has_binary_content(data: &[u8]) -> bool {
    data.iter()
        .any(|&b| b > 127 || (b < 32 && !matches!(b, b'\t' | b'\n' | b'\r' | 0)))
}

pub fn hex_signature(data: &[u8]) -> String {
    hex::encode(&data[..data.len().min(HEX_SIGNATURE_LEN)])
}

// ── Segmenter ─────────────────────────────────────────────────────────────────

/// Build the ordered block list for `data` given its null regions.
///
/// Emits the leading span (if non-empty), every span between consecutive
/// regions, and the trailing span after the last region.  A buffer with no
/// regions at all is a single block.
pub fn segment_blocks(
    data:       &[u8],
    regions:    &[NullRegion],
    classifier: &dyn BlockClassifier,
) -> Vec<Block> {
    let mut sorted: Vec<&NullRegion> = regions.iter().collect();
    sorted.sort_by_key(|r| r.start);

    let mut spans: Vec<(usize, usize)> = Vec::new();
    let mut last = 0usize;
    for region in sorted {
        if region.start > last {
            spans.push((last, region.start - 1));
        }
        last = last.max(region.end + 1);
    }
    if last < data.len() {
        spans.push((last, data.len() - 1));
    }

    spans
        .into_iter()
        .enumerate()
        .map(|(id, (start, end))| {
            let bytes = &data[start..=end];
            Block {
                id,
                start,
                end,
                size:          end - start + 1,
                kind:          classifier.classify(id, bytes),
                has_text:      has_text_content(bytes),
                has_binary:    has_binary_content(bytes),
                signature_hex: hex_signature(bytes),
            }
        })
        .collect()
}
