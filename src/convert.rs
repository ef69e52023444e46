//! End-to-end pipeline: a parsed invoice goes into a BK container on disk.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::container::{Container, ContainerError, ContainerOptions, MergeSummary};
use crate::model::InvoiceId;
use crate::nf::ParsedInvoice;
use crate::stock::{stock_deltas, StockReport};

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("No items found in the invoice")]
    NoItems,
    #[error(transparent)]
    Container(#[from] ContainerError),
    #[error("Invalid invoice JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug)]
pub struct Conversion {
    pub invoice_id: Option<InvoiceId>,
    pub invoices:   usize,
    pub stock:      StockReport,
    pub output:     PathBuf,
}

/// Read a parsed-invoice JSON file.
pub fn read_invoice<P: AsRef<Path>>(path: P) -> Result<ParsedInvoice, ConvertError> {
    let text = std::fs::read_to_string(path)?;
    Ok(ParsedInvoice::from_json(&text)?)
}

/// Add `nf` to the container at `base` (or to a fresh one when `base` is
/// absent or does not exist), save the result to `output` and report the
/// stock movement implied by the invoice lines.
pub fn convert_invoice(
    nf:      &ParsedInvoice,
    base:    Option<&Path>,
    output:  &Path,
    options: ContainerOptions,
) -> Result<Conversion, ConvertError> {
    if nf.items.is_empty() {
        return Err(ConvertError::NoItems);
    }

    let mut container = match base {
        Some(path) if path.exists() => Container::open(path, options)?,
        _ => {
            info!("no existing container, creating a new one");
            Container::empty(options)
        }
    };

    let invoice_id = container.add_invoice(nf)?;
    let stock = stock_deltas(&nf.items);
    container.save(output)?;

    Ok(Conversion {
        invoice_id,
        invoices: container.repository().len(),
        stock,
        output: output.to_path_buf(),
    })
}

/// Merge the container at `other` into the one at `base` and save to `output`.
pub fn merge_files(
    base:    &Path,
    other:   &Path,
    output:  &Path,
    options: ContainerOptions,
) -> Result<MergeSummary, ConvertError> {
    let mut container = Container::open(base, options)?;
    let summary = container.merge_file(other)?;
    container.save(output)?;
    Ok(summary)
}

/// `<dir>/<stem>_converted.bk` next to the invoice file.
pub fn default_output(nf_path: &Path) -> PathBuf {
    with_suffix(nf_path, "_converted")
}

/// `<dir>/<stem>_merged.bk` next to the merged-in container.
pub fn default_merge_output(other: &Path) -> PathBuf {
    with_suffix(other, "_merged")
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let stem = path.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
    path.with_file_name(format!("{stem}{suffix}.bk"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invoice_without_items_is_rejected() {
        let err = convert_invoice(
            &ParsedInvoice::default(),
            None,
            Path::new("unused.bk"),
            ContainerOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ConvertError::NoItems));
    }

    #[test]
    fn default_paths() {
        assert_eq!(default_output(Path::new("in/nota.json")), PathBuf::from("in/nota_converted.bk"));
        assert_eq!(default_merge_output(Path::new("/x/loja.bk")), PathBuf::from("/x/loja_merged.bk"));
    }
}
