pub mod header;
pub mod layout;
pub mod schema;
pub mod codec;
pub mod model;
pub mod repository;
pub mod nf;
pub mod stock;
pub mod container;
pub mod convert;

pub use header::{Header, HeaderError, SIGNATURE};
pub use layout::{Block, BlockClassifier, BlockKind, NullRegion, OrdinalClassifier};
pub use schema::{FieldDefinition, FieldType, Schema};
pub use codec::{decode_record, encode_record, RecordError};
pub use model::{Invoice, InvoiceStatus, Item, Payment, ValidationError};
pub use repository::Repository;
pub use nf::ParsedInvoice;
pub use stock::{stock_deltas, StockDelta};
pub use container::{Container, ContainerError, ContainerOptions, LoadReport};
