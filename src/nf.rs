//! Structured invoice ("nota fiscal") records produced by the upstream
//! extraction step.  This crate only consumes them; the JSON shape matches
//! what the extractor writes.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::model::Item;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NfHeader {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numero_nf:       Option<String>,
    /// `DD/MM/YYYY`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_emissao:    Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cnpj:            Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estabelecimento: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endereco:        Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NfItem {
    pub codigo:         String,
    pub descricao:      String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embalagem:      Option<String>,
    pub quantidade:     u32,
    #[serde(default = "default_unidade")]
    pub unidade:        String,
    pub valor_unitario: Decimal,
    pub valor_total:    Decimal,
}

fn default_unidade() -> String {
    "UN".to_string()
}

impl From<&NfItem> for Item {
    fn from(nf: &NfItem) -> Self {
        Item {
            codigo:         nf.codigo.clone(),
            descricao:      nf.descricao.clone(),
            quantidade:     nf.quantidade,
            unidade:        nf.unidade.clone(),
            valor_unitario: nf.valor_unitario,
            valor_total:    nf.valor_total,
            ..Item::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NfPayment {
    #[serde(default)]
    pub valor_total:     Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valor_desconto:  Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forma_pagamento: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tipo_cartao:     Option<String>,
}

impl NfPayment {
    pub fn desconto(&self) -> Decimal {
        self.valor_desconto.unwrap_or(Decimal::ZERO)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedInvoice {
    #[serde(default)]
    pub header:  NfHeader,
    #[serde(default)]
    pub items:   Vec<NfItem>,
    #[serde(default)]
    pub payment: NfPayment,
}

const CSV_HEADER: &str = "codigo,descricao,quantidade,unidade,valor_unitario,valor_total";

impl ParsedInvoice {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Item lines as CSV.  An invoice without items yields the header line
    /// followed by a newline.
    pub fn to_csv(&self) -> String {
        if self.items.is_empty() {
            return format!("{CSV_HEADER}\n");
        }
        let mut lines = vec![CSV_HEADER.to_string()];
        lines.extend(self.items.iter().map(|i| {
            format!(
                "{},{},{},{},{},{}",
                i.codigo, i.descricao, i.quantidade, i.unidade, i.valor_unitario, i.valor_total
            )
        }));
        lines.join("\n")
    }
}
