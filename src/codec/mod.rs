//! Record codec: fixed-width byte slices <-> [`Invoice`] values.
//!
//! # Decoding
//! Decoding is permissive per field.  Text is decoded lossily and trimmed; a
//! malformed `YYYYMMDD` date leaves the field absent; an unparsable decimal
//! becomes zero.  The only hard failure is a slice of the wrong length, and
//! even that is reported as a value, never a panic.
//!
//! # Encoding
//! Each field is rendered as text (decimals with exactly two fraction digits,
//! dates back to `YYYYMMDD`), left-justified, space-padded and truncated to
//! its width.  Values wider than their field are cut; that loss is part of
//! the format.

use std::str::FromStr;

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::debug;

use crate::model::{Invoice, InvoiceStatus};
use crate::schema::{FieldDefinition, FieldType, Schema, DATE_YYYYMMDD};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("Record is {actual} bytes, expected {expected}")]
    Length { expected: usize, actual: usize },
}

#[derive(Debug, Clone, PartialEq)]
enum FieldValue {
    Text(String),
    Date(Option<String>),
    Decimal(Decimal),
}

// ── Decode ────────────────────────────────────────────────────────────────────

/// Decode one record located at `position` in the container buffer.
pub fn decode_record(schema: &Schema, record: &[u8], position: usize) -> Result<Invoice, RecordError> {
    let expected = schema.record_size();
    if record.len() != expected {
        return Err(RecordError::Length { expected, actual: record.len() });
    }

    let mut invoice = Invoice { position, ..Invoice::default() };
    let mut status = String::new();

    for field in schema.fields() {
        let raw = &record[field.offset..field.offset + field.size];
        match (field.name, decode_field(field, raw)) {
            ("numero",      FieldValue::Text(s))    => invoice.numero = s,
            ("serie",       FieldValue::Text(s))    => invoice.serie = s,
            ("cliente",     FieldValue::Text(s))    => invoice.cliente = s,
            ("status",      FieldValue::Text(s))    => status = s,
            ("dataEmissao", FieldValue::Date(d))    => invoice.data_emissao = d,
            ("valorTotal",  FieldValue::Decimal(d)) => invoice.valor_total = d,
            ("desconto",    FieldValue::Decimal(d)) => invoice.desconto = d,
            ("valorFinal",  FieldValue::Decimal(d)) => invoice.valor_final = d,
            (name, _) => debug!(field = name, position, "ignoring unmapped field"),
        }
    }
    invoice.status = InvoiceStatus::from_code(&status);

    Ok(invoice)
}

fn decode_field(field: &FieldDefinition, raw: &[u8]) -> FieldValue {
    let text = String::from_utf8_lossy(raw);
    let text = text.trim();
    match field.kind {
        FieldType::Text    => FieldValue::Text(text.to_string()),
        FieldType::Date    => FieldValue::Date(match field.format {
            Some(DATE_YYYYMMDD) => parse_yyyymmdd(text),
            _ => None,
        }),
        FieldType::Decimal => FieldValue::Decimal(parse_decimal(text)),
    }
}

/// `"20240315"` -> `"2024-03-15"`.  Only month 1-12 and day 1-31 are checked;
/// anything else yields `None`.
pub fn parse_yyyymmdd(text: &str) -> Option<String> {
    if text.len() != 8 || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: u32 = text[0..4].parse().ok()?;
    let month: u32 = text[4..6].parse().ok()?;
    let day: u32 = text[6..8].parse().ok()?;
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }
    Some(format!("{year:04}-{month:02}-{day:02}"))
}

/// Parse a decimal field, accepting a comma as the decimal separator.
/// Text without digits or that fails to parse is zero.
pub fn parse_decimal(text: &str) -> Decimal {
    let text = text.trim();
    if !text.bytes().any(|b| b.is_ascii_digit()) {
        return Decimal::ZERO;
    }
    let text = text.replace(',', ".");
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .unwrap_or_else(|e| {
            debug!(value = %text, error = %e, "unparsable decimal, using zero");
            Decimal::ZERO
        })
}

// ── Encode ────────────────────────────────────────────────────────────────────

/// Encode `invoice` into exactly `schema.record_size()` bytes.
pub fn encode_record(schema: &Schema, invoice: &Invoice) -> Vec<u8> {
    let mut record = Vec::with_capacity(schema.record_size());
    for field in schema.fields() {
        record.extend(fit(&field_text(field, invoice), field.size));
    }
    record.resize(schema.record_size(), 0);
    record
}

fn field_text(field: &FieldDefinition, invoice: &Invoice) -> String {
    match field.name {
        "numero"      => invoice.numero.clone(),
        "serie"       => invoice.serie.clone(),
        "cliente"     => invoice.cliente.clone(),
        "status"      => invoice.status.code().to_string(),
        "dataEmissao" => match (&invoice.data_emissao, field.format) {
            (Some(iso), Some(DATE_YYYYMMDD)) => iso.replace('-', ""),
            (Some(iso), _)                   => iso.clone(),
            (None, _)                        => String::new(),
        },
        "valorTotal"  => format_decimal(invoice.valor_total),
        "desconto"    => format_decimal(invoice.desconto),
        "valorFinal"  => format_decimal(invoice.valor_final),
        _ => String::new(),
    }
}

/// Two fraction digits, always: `45.9` -> `"45.90"`.
pub fn format_decimal(value: Decimal) -> String {
    let mut v = value.round_dp(2);
    v.rescale(2);
    v.to_string()
}

/// Left-justify `value` into `size` bytes, cutting on a char boundary.
fn fit(value: &str, size: usize) -> Vec<u8> {
    let mut end = value.len().min(size);
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    let mut out = value.as_bytes()[..end].to_vec();
    out.resize(size, b' ');
    out
}
