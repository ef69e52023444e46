//! Logical entities recovered from (or destined for) a BK container.
//!
//! Only [`Invoice`] is durable: items and payments live in memory alone.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type InvoiceId = u32;
pub type ItemId    = u32;
pub type PaymentId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InvoiceStatus {
    #[default]
    Ativa,
    Cancelada,
    Devolvida,
}

impl InvoiceStatus {
    /// Map the one-byte status code.  Blank and unknown codes are `Ativa`.
    pub fn from_code(code: &str) -> Self {
        match code {
            "C" => InvoiceStatus::Cancelada,
            "D" => InvoiceStatus::Devolvida,
            _   => InvoiceStatus::Ativa,
        }
    }

    pub fn code(&self) -> char {
        match self {
            InvoiceStatus::Ativa     => 'A',
            InvoiceStatus::Cancelada => 'C',
            InvoiceStatus::Devolvida => 'D',
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("numero is empty")]
    EmptyNumero,
    #[error("numero {0:?} is not all digits")]
    NonNumericNumero(String),
    #[error("valorTotal {0} is not positive")]
    NonPositiveTotal(Decimal),
    #[error("dataEmissao is missing")]
    MissingEmissionDate,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Invoice {
    pub id:           InvoiceId,
    /// Byte offset of the record inside the container buffer.
    pub position:     usize,
    pub numero:       String,
    pub serie:        String,
    /// ISO-8601 `YYYY-MM-DD`.
    pub data_emissao: Option<String>,
    pub valor_total:  Decimal,
    pub desconto:     Decimal,
    pub valor_final:  Decimal,
    pub cliente:      String,
    pub status:       InvoiceStatus,
    pub items:        Vec<ItemId>,
    pub payments:     Vec<PaymentId>,
}

impl Invoice {
    /// Acceptance predicate applied before an invoice enters a repository.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let numero = self.numero.trim();
        if numero.is_empty() {
            return Err(ValidationError::EmptyNumero);
        }
        if !numero.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ValidationError::NonNumericNumero(self.numero.clone()));
        }
        if self.valor_total <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveTotal(self.valor_total));
        }
        if self.data_emissao.is_none() {
            return Err(ValidationError::MissingEmissionDate);
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Item {
    pub id:             ItemId,
    pub invoice_id:     InvoiceId,
    /// 1-based position within the invoice.
    pub sequencial:     u32,
    pub codigo:         String,
    pub descricao:      String,
    pub quantidade:     u32,
    pub unidade:        String,
    pub valor_unitario: Decimal,
    pub valor_total:    Decimal,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Payment {
    pub id:              PaymentId,
    pub invoice_id:      InvoiceId,
    pub forma_pagamento: String,
    pub valor:           Decimal,
    pub parcelas:        u32,
}
