//! Stock delta report derived from invoice item lines.
//!
//! There is no prior-stock source, so `quantidade_anterior` is always zero
//! and `quantidade_atual` equals the summed entry.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::nf::NfItem;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockDelta {
    pub codigo:              String,
    /// Description of the first line seen for this code.
    pub descricao:           String,
    pub quantidade_anterior: u64,
    pub quantidade_entrada:  u64,
    pub quantidade_atual:    u64,
}

pub type StockReport = BTreeMap<String, StockDelta>;

pub fn stock_deltas<'a, I>(items: I) -> StockReport
where
    I: IntoIterator<Item = &'a NfItem>,
{
    let mut report = StockReport::new();
    for item in items {
        let qty = u64::from(item.quantidade);
        let delta = report.entry(item.codigo.clone()).or_insert_with(|| StockDelta {
            codigo:              item.codigo.clone(),
            descricao:           item.descricao.clone(),
            quantidade_anterior: 0,
            quantidade_entrada:  0,
            quantidade_atual:    0,
        });
        delta.quantidade_entrada += qty;
        delta.quantidade_atual += qty;
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(codigo: &str, descricao: &str, quantidade: u32) -> NfItem {
        NfItem {
            codigo:    codigo.into(),
            descricao: descricao.into(),
            quantidade,
            ..NfItem::default()
        }
    }

    #[test]
    fn aggregates_by_code() {
        let items = vec![line("P1", "Cafe", 2), line("P2", "Leite", 1), line("P1", "Cafe 2", 3)];
        let report = stock_deltas(&items);
        assert_eq!(report.len(), 2);

        let p1 = &report["P1"];
        assert_eq!(p1.descricao, "Cafe");
        assert_eq!(p1.quantidade_anterior, 0);
        assert_eq!(p1.quantidade_entrada, 5);
        assert_eq!(p1.quantidade_atual, 5);
        assert_eq!(report["P2"].quantidade_atual, 1);
    }

    #[test]
    fn empty_input() {
        assert!(stock_deltas(&Vec::<NfItem>::new()).is_empty());
    }
}
