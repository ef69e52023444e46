//! High-level [`Container`] API — one BK buffer and everything decoded from it.
//!
//! ```no_run
//! use bkfile::container::{Container, ContainerOptions};
//! use bkfile::nf::ParsedInvoice;
//!
//! let nf = ParsedInvoice::from_json(&std::fs::read_to_string("nf.json")?)?;
//!
//! let mut bk = Container::open("loja.bk", ContainerOptions::default())?;
//! bk.add_invoice(&nf)?;
//! bk.merge_file("filial.bk")?;
//! bk.save("loja_merged.bk")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Every structural operation rewrites the whole in-memory buffer and then
//! re-runs the load pipeline (scan, segment, decode) over it, so `header`,
//! `blocks` and `repository` always describe the current bytes.  Items and
//! payments are not part of the byte layout; they do not survive a reload.

use std::fmt;
use std::fs;
use std::io;
use std::iter;
use std::path::Path;

use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::codec::{decode_record, encode_record, RecordError};
use crate::header::{Header, HeaderError, VERSION};
use crate::layout::{
    scan_null_regions, segment_blocks, Block, BlockClassifier, BlockKind, NullRegion,
    OrdinalClassifier, DEFAULT_NULL_THRESHOLD,
};
use crate::model::{Invoice, InvoiceId, InvoiceStatus, Item, ValidationError};
use crate::nf::ParsedInvoice;
use crate::repository::Repository;
use crate::schema::Schema;

/// Null bytes written after the Header and after the Definition block.
pub const SEPARATOR_LEN: usize = 50;
/// Upper bound on records decoded from a single Data block.
pub const MAX_RECORDS_PER_BLOCK: usize = 5000;
/// Width of each per-field slot in a synthesized Definition block.
pub const DEFINITION_SLOT: usize = 20;

pub const DEFAULT_SERIE: &str = "001";
pub const DEFAULT_CLIENTE: &str = "CONSUMIDOR";

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum ContainerError {
    #[error(transparent)]
    Signature(#[from] HeaderError),
    #[error("Required {0} block not found")]
    MissingBlock(BlockKind),
    #[error("Container holds no data")]
    Empty,
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Why one record did not make it into the repository.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FailureReason {
    #[error("decode failed: {0}")]
    Decode(RecordError),
    #[error("rejected: {0}")]
    Rejected(ValidationError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordFailure {
    /// Absolute byte offset of the record.
    pub offset:   usize,
    pub block_id: usize,
    pub reason:   FailureReason,
}

// ── Options ───────────────────────────────────────────────────────────────────

/// Configuration shared by every container operation.
#[derive(Debug, Clone)]
pub struct ContainerOptions {
    /// Shortest zero run treated as a block separator.
    pub null_threshold:          usize,
    /// Zero bytes written between blocks.  Must be `>= null_threshold` or the
    /// written separators will not be recognised on reload.
    pub separator_len:           usize,
    pub max_records_per_block:   usize,
    /// Version text for synthesized headers.
    pub version:                 String,
    /// Attach placeholder items/payment to every decoded invoice.
    pub synthesize_placeholders: bool,
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self {
            null_threshold:          DEFAULT_NULL_THRESHOLD,
            separator_len:           SEPARATOR_LEN,
            max_records_per_block:   MAX_RECORDS_PER_BLOCK,
            version:                 VERSION.to_string(),
            synthesize_placeholders: true,
        }
    }
}

// ── LoadReport ────────────────────────────────────────────────────────────────

/// Outcome of the most recent decode pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub data_blocks:     usize,
    pub records_scanned: usize,
    pub accepted:        usize,
    /// Data blocks holding more records than `max_records_per_block`.
    pub capped_blocks:   usize,
    pub failures:        Vec<RecordFailure>,
}

impl LoadReport {
    pub fn summary(&self) -> String {
        format!(
            "{} data block(s), {}/{} record(s) accepted, {} dropped{}",
            self.data_blocks,
            self.accepted,
            self.records_scanned,
            self.failures.len(),
            if self.capped_blocks > 0 {
                format!(", {} block(s) capped", self.capped_blocks)
            } else {
                String::new()
            },
        )
    }
}

/// Result of [`Container::merge_container`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeSummary {
    pub copied:  usize,
    pub skipped: usize,
}

// ── Container ─────────────────────────────────────────────────────────────────

pub struct Container {
    data:         Vec<u8>,
    header:       Option<Header>,
    null_regions: Vec<NullRegion>,
    blocks:       Vec<Block>,
    schema:       Schema,
    repository:   Repository,
    report:       LoadReport,
    options:      ContainerOptions,
    classifier:   Box<dyn BlockClassifier>,
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("size", &self.data.len())
            .field("header", &self.header)
            .field("blocks", &self.blocks.len())
            .field("invoices", &self.repository.len())
            .finish_non_exhaustive()
    }
}

impl Container {
    // ── Constructors ─────────────────────────────────────────────────────────

    /// A container with no buffer yet.  The first [`Self::add_invoice`]
    /// seeds it via [`Self::create_empty`].
    pub fn new(options: ContainerOptions) -> Self {
        Self {
            data:         Vec::new(),
            header:       None,
            null_regions: Vec::new(),
            blocks:       Vec::new(),
            schema:       Schema::invoice(),
            repository:   Repository::new(),
            report:       LoadReport::default(),
            options,
            classifier:   Box::new(OrdinalClassifier),
        }
    }

    /// Replace the block classifier.  Takes effect on the next load.
    pub fn with_classifier<C: BlockClassifier + 'static>(mut self, classifier: C) -> Self {
        self.classifier = Box::new(classifier);
        self
    }

    /// A freshly synthesized container: header, placeholder Definition block
    /// and an empty data region.
    pub fn empty(options: ContainerOptions) -> Self {
        let mut c = Self::new(options);
        c.create_empty();
        c
    }

    pub fn from_bytes(data: Vec<u8>, options: ContainerOptions) -> Result<Self, ContainerError> {
        let mut c = Self::new(options);
        c.load(data)?;
        Ok(c)
    }

    pub fn open<P: AsRef<Path>>(path: P, options: ContainerOptions) -> Result<Self, ContainerError> {
        let data = fs::read(path.as_ref())?;
        debug!(path = %path.as_ref().display(), size = data.len(), "read container");
        Self::from_bytes(data, options)
    }

    // ── Load ─────────────────────────────────────────────────────────────────

    /// Replace the buffer with `data` and decode it.  Fails only when the
    /// signature is wrong; malformed records are dropped and listed in the
    /// returned report.
    pub fn load(&mut self, data: Vec<u8>) -> Result<&LoadReport, ContainerError> {
        Header::check_signature(&data)?;
        self.data = data;
        self.reparse();
        info!(
            size = self.data.len(),
            blocks = self.blocks.len(),
            invoices = self.repository.len(),
            "{}",
            self.report.summary()
        );
        Ok(&self.report)
    }

    /// Synthesize `header + separator + definition + separator` with an empty
    /// data region.  The Definition block is one space-padded slot per field
    /// holding the field name; it reserves space, it does not encode types.
    pub fn create_empty(&mut self) {
        let sep = self.options.separator_len;
        let mut data = Header::synthesize(&self.options.version);
        data.extend(iter::repeat(0u8).take(sep));
        for field in self.schema.fields() {
            let mut slot = field.name.as_bytes().to_vec();
            slot.resize(DEFINITION_SLOT, b' ');
            data.extend_from_slice(&slot[..DEFINITION_SLOT]);
        }
        data.extend(iter::repeat(0u8).take(sep));
        self.data = data;
        self.reparse();
        debug!(size = self.data.len(), "synthesized empty container");
    }

    fn reparse(&mut self) {
        self.header = Header::parse(&self.data).ok();
        self.null_regions = scan_null_regions(&self.data, self.options.null_threshold);
        self.blocks = segment_blocks(&self.data, &self.null_regions, &*self.classifier);
        self.schema = Schema::invoice();
        self.extract_invoices();
    }

    fn extract_invoices(&mut self) {
        let record_size = self.schema.record_size();
        let mut repo = Repository::new();
        let mut report = LoadReport::default();

        for block in self.blocks.iter().filter(|b| b.kind == BlockKind::Data) {
            report.data_blocks += 1;
            if record_size == 0 {
                continue;
            }
            let available = block.size / record_size;
            let count = available.min(self.options.max_records_per_block);
            if available > count {
                report.capped_blocks += 1;
                warn!(block = block.id, available, decoded = count, "data block capped");
            }

            for i in 0..count {
                let offset = block.start + i * record_size;
                let bytes = &self.data[offset..offset + record_size];
                report.records_scanned += 1;

                let outcome = decode_record(&self.schema, bytes, offset)
                    .map_err(FailureReason::Decode)
                    .and_then(|inv| repo.add_invoice(inv).map_err(FailureReason::Rejected));
                match outcome {
                    Ok(id) => {
                        report.accepted += 1;
                        if self.options.synthesize_placeholders {
                            repo.add_placeholders(id);
                        }
                    }
                    Err(reason) => {
                        debug!(offset, block = block.id, %reason, "record dropped");
                        report.failures.push(RecordFailure { offset, block_id: block.id, reason });
                    }
                }
            }
        }

        repo.sort_by_numero();
        self.repository = repo;
        self.report = report;
    }

    // ── Mutation ─────────────────────────────────────────────────────────────

    /// Append `nf` as a new invoice record at the end of the buffer, reload,
    /// and link `nf`'s item lines to the new invoice.
    ///
    /// Returns the new invoice id, or `None` when the appended record fails
    /// validation on reload (its bytes stay in the buffer; its items are
    /// not linked).
    pub fn add_invoice(&mut self, nf: &ParsedInvoice) -> Result<Option<InvoiceId>, ContainerError> {
        if self.data.is_empty() {
            self.create_empty();
        }
        self.require_data_region()?;

        let emission = nf
            .header
            .data_emissao
            .as_deref()
            .and_then(parse_dmy)
            .unwrap_or_else(|| Local::now().date_naive());
        let numero = nf
            .header
            .numero_nf
            .clone()
            .unwrap_or_else(|| format!("{:06}", self.repository.len() + 1));
        let desconto = nf.payment.desconto();
        let position = self.data.len();

        let invoice = Invoice {
            position,
            numero,
            serie:        DEFAULT_SERIE.to_string(),
            data_emissao: Some(emission.format("%Y-%m-%d").to_string()),
            valor_total:  nf.payment.valor_total,
            desconto,
            valor_final:  nf.payment.valor_total.saturating_sub(desconto),
            cliente:      DEFAULT_CLIENTE.to_string(),
            status:       InvoiceStatus::Ativa,
            ..Invoice::default()
        };
        let record = encode_record(&self.schema, &invoice);
        self.data.extend_from_slice(&record);
        self.reparse();

        let id = self
            .repository
            .invoices()
            .iter()
            .find(|i| i.position == position)
            .map(|i| i.id);
        match id {
            Some(id) => {
                let linked = self.repository.add_items_for_invoice(id, nf.items.iter().map(Item::from));
                info!(numero = %invoice.numero, id, items = linked.len(), position, "invoice appended");
            }
            None => warn!(numero = %invoice.numero, position, "appended invoice failed validation"),
        }
        Ok(id)
    }

    /// Copy invoices from `other` (with their items and payments) whose
    /// `numero` is not present here, then rebuild.
    pub fn merge_container(&mut self, other: &Container) -> Result<MergeSummary, ContainerError> {
        if self.data.is_empty() {
            self.create_empty();
        }
        self.require(BlockKind::Header)?;
        self.require(BlockKind::Definition)?;

        let copied = self.repository.merge_from(&other.repository).len();
        let summary = MergeSummary { copied, skipped: other.repository.len() - copied };
        self.rebuild()?;
        info!(copied = summary.copied, skipped = summary.skipped, "merged container");
        Ok(summary)
    }

    /// Load `other` as a container (its signature must match) and merge it.
    pub fn merge_from(&mut self, other: Vec<u8>) -> Result<MergeSummary, ContainerError> {
        let other = Container::from_bytes(other, self.options.clone())?;
        self.merge_container(&other)
    }

    pub fn merge_file<P: AsRef<Path>>(&mut self, path: P) -> Result<MergeSummary, ContainerError> {
        let other = Container::open(path, self.options.clone())?;
        self.merge_container(&other)
    }

    /// Rewrite the buffer as `header + separator + definition + separator +
    /// records`, keeping the current Header and Definition bytes verbatim and
    /// re-encoding every invoice in repository order.
    pub fn rebuild(&mut self) -> Result<(), ContainerError> {
        let header = self.require(BlockKind::Header)?.bytes(&self.data).to_vec();
        let definition = self.require(BlockKind::Definition)?.bytes(&self.data).to_vec();
        let sep = self.options.separator_len;

        let mut data = Vec::with_capacity(
            header.len() + definition.len() + 2 * sep
                + self.repository.len() * self.schema.record_size(),
        );
        data.extend_from_slice(&header);
        data.extend(iter::repeat(0u8).take(sep));
        data.extend_from_slice(&definition);
        data.extend(iter::repeat(0u8).take(sep));
        for invoice in self.repository.invoices() {
            data.extend(encode_record(&self.schema, invoice));
        }

        let before = self.repository.len();
        self.data = data;
        self.reparse();
        info!(size = self.data.len(), invoices = before, "rebuilt container");
        Ok(())
    }

    /// Write the whole buffer to `path` in one call.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ContainerError> {
        if self.data.is_empty() {
            return Err(ContainerError::Empty);
        }
        fs::write(path.as_ref(), &self.data)?;
        info!(path = %path.as_ref().display(), size = self.data.len(), "saved container");
        Ok(())
    }

    // ── Structure checks ─────────────────────────────────────────────────────

    fn require(&self, kind: BlockKind) -> Result<&Block, ContainerError> {
        self.block(kind).ok_or(ContainerError::MissingBlock(kind))
    }

    /// A Data block exists, or the Definition block is followed by a
    /// trailing separator that new records can be appended after.
    fn require_data_region(&self) -> Result<(), ContainerError> {
        if self.block(BlockKind::Data).is_some() {
            return Ok(());
        }
        let definition = self.require(BlockKind::Definition)?;
        let open_tail = self
            .null_regions
            .iter()
            .any(|r| r.start > definition.end && r.end + 1 == self.data.len());
        if open_tail {
            Ok(())
        } else {
            Err(ContainerError::MissingBlock(BlockKind::Data))
        }
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    pub fn data(&self) -> &[u8] { &self.data }
    pub fn into_bytes(self) -> Vec<u8> { self.data }
    pub fn header(&self) -> Option<&Header> { self.header.as_ref() }
    pub fn null_regions(&self) -> &[NullRegion] { &self.null_regions }
    pub fn blocks(&self) -> &[Block] { &self.blocks }
    pub fn schema(&self) -> &Schema { &self.schema }
    pub fn repository(&self) -> &Repository { &self.repository }
    pub fn last_report(&self) -> &LoadReport { &self.report }
    pub fn options(&self) -> &ContainerOptions { &self.options }

    /// First block of the given kind.
    pub fn block(&self, kind: BlockKind) -> Option<&Block> {
        self.blocks.iter().find(|b| b.kind == kind)
    }

    /// Sum of `valor_final` over every invoice.
    pub fn total_value(&self) -> Decimal {
        self.repository.invoices().iter().map(|i| i.valor_final).sum()
    }
}

/// Best-effort `DD/MM/YYYY`; `None` on any malformed part or impossible date.
/// The year must be exactly four digits so it fits the `YYYYMMDD` field.
pub fn parse_dmy(text: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = text.trim().split('/').collect();
    let [day, month, year] = parts.as_slice() else { return None };
    let year = year.trim();
    if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::from_ymd_opt(
        year.parse().ok()?,
        month.trim().parse().ok()?,
        day.trim().parse().ok()?,
    )
}
