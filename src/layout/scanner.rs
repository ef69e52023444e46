//! Null-region scanner — locate the zero-byte runs that delimit blocks.
//!
//! A BK container carries no table of contents.  Its writer pads between
//! blocks with long runs of `0x00`, and those runs are the only structural
//! delimiter.  The scanner makes one left-to-right pass and reports every
//! maximal run of at least `threshold` zero bytes.  Shorter runs are ordinary
//! record content and are not reported.

/// Default minimum run length treated as a separator.
pub const DEFAULT_NULL_THRESHOLD: usize = 20;

/// One maximal run of zero bytes.  `start` and `end` are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NullRegion {
    pub id:    usize,
    pub start: usize,
    pub end:   usize,
    pub size:  usize,
}

/// Report every maximal zero run in `data` whose length is `>= threshold`,
/// ordered by start offset.  A run still open at end-of-buffer is closed and
/// reported like any other.
pub fn scan_null_regions(data: &[u8], threshold: usize) -> Vec<NullRegion> {
    let mut regions = Vec::new();
    let mut run_start: Option<usize> = None;

    let close = |start: usize, end: usize, regions: &mut Vec<NullRegion>| {
        let size = end - start + 1;
        if size >= threshold {
            let id = regions.len();
            regions.push(NullRegion { id, start, end, size });
        }
    };

    for (i, &b) in data.iter().enumerate() {
        match (b == 0, run_start) {
            (true, None)         => run_start = Some(i),
            (false, Some(start)) => {
                close(start, i - 1, &mut regions);
                run_start = None;
            }
            _ => {}
        }
    }
    if let Some(start) = run_start {
        close(start, data.len() - 1, &mut regions);
    }

    regions
}
