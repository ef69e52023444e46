use rust_decimal::Decimal;
use serde::Serialize;

use crate::model::{
    Invoice, InvoiceId, Item, ItemId, Payment, PaymentId, ValidationError,
};

/// Number of placeholder items synthesized per decoded invoice.
pub const PLACEHOLDER_ITEMS: u32 = 3;

/// In-memory tables of one container: invoices, items and payments, each
/// with its own monotonically increasing id counter.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Repository {
    invoices:        Vec<Invoice>,
    items:           Vec<Item>,
    payments:        Vec<Payment>,
    next_invoice_id: InvoiceId,
    next_item_id:    ItemId,
    next_payment_id: PaymentId,
}

impl Repository {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Insert ──────────────────────────────────────────────────────────────

    /// Validate and store `invoice` under a fresh id.  Rejected invoices are
    /// not stored and do not consume an id.  Item and payment links carried
    /// by the value are discarded; rows are linked through
    /// [`Self::add_item`] and [`Self::add_payment`].
    pub fn add_invoice(&mut self, mut invoice: Invoice) -> Result<InvoiceId, ValidationError> {
        invoice.validate()?;
        let id = self.next_invoice_id;
        self.next_invoice_id += 1;
        invoice.id = id;
        invoice.items.clear();
        invoice.payments.clear();
        self.invoices.push(invoice);
        Ok(id)
    }

    /// Store `item` linked to `invoice_id`.  Returns `None` when no such
    /// invoice exists.
    pub fn add_item(&mut self, invoice_id: InvoiceId, mut item: Item) -> Option<ItemId> {
        let invoice = self.invoices.iter_mut().find(|i| i.id == invoice_id)?;
        let id = self.next_item_id;
        self.next_item_id += 1;
        item.id = id;
        item.invoice_id = invoice_id;
        invoice.items.push(id);
        self.items.push(item);
        Some(id)
    }

    /// Store `items` for `invoice_id`, numbering `sequencial` from 1.
    pub fn add_items_for_invoice<I>(&mut self, invoice_id: InvoiceId, items: I) -> Vec<ItemId>
    where
        I: IntoIterator<Item = Item>,
    {
        items
            .into_iter()
            .enumerate()
            .filter_map(|(i, mut item)| {
                item.sequencial = i as u32 + 1;
                self.add_item(invoice_id, item)
            })
            .collect()
    }

    pub fn add_payment(&mut self, invoice_id: InvoiceId, mut payment: Payment) -> Option<PaymentId> {
        let invoice = self.invoices.iter_mut().find(|i| i.id == invoice_id)?;
        let id = self.next_payment_id;
        self.next_payment_id += 1;
        payment.id = id;
        payment.invoice_id = invoice_id;
        invoice.payments.push(id);
        self.payments.push(payment);
        Some(id)
    }

    /// Attach the stand-in rows BK files never carry: three items
    /// (`P10000`..`P10002`, quantity i+1 at 20 + 10i each) and one cash
    /// payment for the final value, or the total when the final is zero.
    pub fn add_placeholders(&mut self, invoice_id: InvoiceId) {
        let Some(invoice) = self.invoice(invoice_id) else { return };
        let numero = invoice.numero.clone();
        let valor = if invoice.valor_final.is_zero() {
            invoice.valor_total
        } else {
            invoice.valor_final
        };

        let items = (0..PLACEHOLDER_ITEMS).map(|i| {
            let price = Decimal::from(20 + 10 * i);
            let quantity = i + 1;
            Item {
                codigo:         format!("P{}", 10000 + i),
                descricao:      format!("Produto {} da NF {}", i + 1, numero),
                quantidade:     quantity,
                unidade:        "UN".into(),
                valor_unitario: price,
                valor_total:    price * Decimal::from(quantity),
                ..Item::default()
            }
        });
        self.add_items_for_invoice(invoice_id, items.collect::<Vec<_>>());
        self.add_payment(invoice_id, Payment {
            forma_pagamento: "DINHEIRO".into(),
            valor,
            parcelas: 1,
            ..Payment::default()
        });
    }

    // ── Query ───────────────────────────────────────────────────────────────

    pub fn invoices(&self) -> &[Invoice] { &self.invoices }
    pub fn items(&self) -> &[Item] { &self.items }
    pub fn payments(&self) -> &[Payment] { &self.payments }

    pub fn len(&self) -> usize { self.invoices.len() }
    pub fn is_empty(&self) -> bool { self.invoices.is_empty() }

    pub fn invoice(&self, id: InvoiceId) -> Option<&Invoice> {
        self.invoices.iter().find(|i| i.id == id)
    }

    /// First invoice whose `numero` matches exactly.
    pub fn find_by_numero(&self, numero: &str) -> Option<&Invoice> {
        self.invoices.iter().find(|i| i.numero == numero)
    }

    pub fn contains_numero(&self, numero: &str) -> bool {
        self.find_by_numero(numero).is_some()
    }

    pub fn items_for(&self, invoice_id: InvoiceId) -> impl Iterator<Item = &Item> {
        self.items.iter().filter(move |i| i.invoice_id == invoice_id)
    }

    pub fn payments_for(&self, invoice_id: InvoiceId) -> impl Iterator<Item = &Payment> {
        self.payments.iter().filter(move |p| p.invoice_id == invoice_id)
    }

    // ── Ordering ────────────────────────────────────────────────────────────

    /// Stable sort of invoices by `numero` (string order).
    pub fn sort_by_numero(&mut self) {
        self.invoices.sort_by(|a, b| a.numero.cmp(&b.numero));
    }

    // ── Cross-repository copy ───────────────────────────────────────────────

    /// Copy every invoice of `other` whose `numero` is not present yet,
    /// together with its items and payments.  Ids are reassigned.  Returns
    /// the new ids in copy order.
    pub fn merge_from(&mut self, other: &Repository) -> Vec<InvoiceId> {
        let mut copied = Vec::new();
        for invoice in &other.invoices {
            if self.contains_numero(&invoice.numero) {
                continue;
            }
            let Ok(new_id) = self.add_invoice(invoice.clone()) else { continue };
            for item in other.items_for(invoice.id) {
                self.add_item(new_id, item.clone());
            }
            for payment in other.payments_for(invoice.id) {
                self.add_payment(new_id, payment.clone());
            }
            copied.push(new_id);
        }
        copied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::InvoiceStatus;

    fn invoice(numero: &str) -> Invoice {
        Invoice {
            numero:       numero.into(),
            valor_total:  Decimal::new(1000, 2),
            valor_final:  Decimal::new(900, 2),
            data_emissao: Some("2024-05-01".into()),
            status:       InvoiceStatus::Ativa,
            ..Invoice::default()
        }
    }

    #[test]
    fn ids_are_monotonic_and_rejections_are_skipped() {
        let mut repo = Repository::new();
        assert_eq!(repo.add_invoice(invoice("000001")), Ok(0));
        assert!(repo.add_invoice(invoice("")).is_err());
        assert_eq!(repo.add_invoice(invoice("000002")), Ok(1));
        assert_eq!(repo.len(), 2);
    }

    #[test]
    fn items_are_linked_and_numbered() {
        let mut repo = Repository::new();
        let id = repo.add_invoice(invoice("000010")).unwrap();
        let ids = repo.add_items_for_invoice(id, vec![Item::default(), Item::default()]);
        assert_eq!(ids, vec![0, 1]);
        let seq: Vec<u32> = repo.items_for(id).map(|i| i.sequencial).collect();
        assert_eq!(seq, vec![1, 2]);
        assert_eq!(repo.invoice(id).unwrap().items, vec![0, 1]);
        assert!(repo.add_item(99, Item::default()).is_none());
    }

    #[test]
    fn placeholders() {
        let mut repo = Repository::new();
        let id = repo.add_invoice(invoice("000777")).unwrap();
        repo.add_placeholders(id);

        let items: Vec<&Item> = repo.items_for(id).collect();
        assert_eq!(items.len(), 3);
        assert_eq!(items[2].codigo, "P10002");
        assert_eq!(items[2].quantidade, 3);
        assert_eq!(items[2].valor_total, Decimal::from(120));
        assert_eq!(items[0].descricao, "Produto 1 da NF 000777");

        let payments: Vec<&Payment> = repo.payments_for(id).collect();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].valor, Decimal::new(900, 2));
        assert_eq!(payments[0].forma_pagamento, "DINHEIRO");
    }

    #[test]
    fn sort_is_stable_on_ties() {
        let mut repo = Repository::new();
        let mut a = invoice("000002");
        a.cliente = "first".into();
        let mut b = invoice("000002");
        b.cliente = "second".into();
        repo.add_invoice(a).unwrap();
        repo.add_invoice(invoice("000001")).unwrap();
        repo.add_invoice(b).unwrap();
        repo.sort_by_numero();
        let order: Vec<(&str, &str)> = repo
            .invoices()
            .iter()
            .map(|i| (i.numero.as_str(), i.cliente.as_str()))
            .collect();
        assert_eq!(order, vec![("000001", ""), ("000002", "first"), ("000002", "second")]);
    }

    #[test]
    fn merge_remaps_ids_and_skips_known_numeros() {
        let mut base = Repository::new();
        base.add_invoice(invoice("000001")).unwrap();

        let mut other = Repository::new();
        let shared = other.add_invoice(invoice("000001")).unwrap();
        other.add_placeholders(shared);
        let fresh = other.add_invoice(invoice("000005")).unwrap();
        other.add_placeholders(fresh);

        let copied = base.merge_from(&other);
        assert_eq!(copied, vec![1]);
        assert_eq!(base.len(), 2);
        assert_eq!(base.items_for(1).count(), 3);
        assert_eq!(base.payments_for(1).count(), 1);
        assert!(base.items().iter().all(|i| i.invoice_id == 1));

        assert!(base.merge_from(&other).is_empty());
        assert_eq!(base.len(), 2);
    }

    #[test]
    fn json_dump_carries_all_tables() {
        let mut repo = Repository::new();
        let id = repo.add_invoice(invoice("000001")).unwrap();
        repo.add_placeholders(id);
        let dump = serde_json::to_value(&repo).unwrap();
        assert_eq!(dump["invoices"][0]["numero"], "000001");
        assert_eq!(dump["items"].as_array().unwrap().len(), PLACEHOLDER_ITEMS as usize);
        assert_eq!(dump["payments"].as_array().unwrap().len(), 1);
    }
}
