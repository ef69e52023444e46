//! The fixed invoice record layout.
//!
//! BK files carry a Definition block, but its bytes are never decoded into a
//! schema: every known writer uses this one table, so it is compiled in.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FieldType {
    Text,
    Date,
    Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldDefinition {
    pub name:     &'static str,
    pub kind:     FieldType,
    pub offset:   usize,
    pub size:     usize,
    pub is_fixed: bool,
    pub format:   Option<&'static str>,
}

/// Only date format in use.
pub const DATE_YYYYMMDD: &str = "YYYYMMDD";

const fn field(
    name: &'static str,
    kind: FieldType,
    offset: usize,
    size: usize,
    format: Option<&'static str>,
) -> FieldDefinition {
    FieldDefinition { name, kind, offset, size, is_fixed: true, format }
}

/// Invoice record fields in non-decreasing offset order.
pub const INVOICE_FIELDS: [FieldDefinition; 8] = [
    field("numero",      FieldType::Text,    0,  6,  None),
    field("serie",       FieldType::Text,    6,  3,  None),
    field("dataEmissao", FieldType::Date,    9,  8,  Some(DATE_YYYYMMDD)),
    field("valorTotal",  FieldType::Decimal, 17, 10, None),
    field("desconto",    FieldType::Decimal, 27, 10, None),
    field("valorFinal",  FieldType::Decimal, 37, 10, None),
    field("cliente",     FieldType::Text,    47, 40, None),
    field("status",      FieldType::Text,    87, 1,  None),
];

/// A record layout: an ordered, immutable field table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schema {
    fields: &'static [FieldDefinition],
}

impl Schema {
    pub const fn new(fields: &'static [FieldDefinition]) -> Self {
        Self { fields }
    }

    /// The invoice layout every BK container uses.
    pub fn invoice() -> Self {
        Self::new(&INVOICE_FIELDS)
    }

    pub fn fields(&self) -> &'static [FieldDefinition] {
        self.fields
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// `last.offset + last.size`; zero for an empty table.
    pub fn record_size(&self) -> usize {
        self.fields.last().map(|f| f.offset + f.size).unwrap_or(0)
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::invoice()
    }
}
