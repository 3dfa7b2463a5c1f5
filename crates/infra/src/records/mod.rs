//! Record families and their lifecycle.
//!
//! Every family (Branch, City, Slider, ...) is served by the same engine. The
//! static registry in [`family`] describes each family's fields and columns.

pub mod engine;
pub mod family;
pub mod query;
pub mod record;
pub mod store;
pub mod tx;

pub use engine::{body_id, body_type, RecordEngine};
pub use family::{Family, FieldKind, FieldSpec, ResourceSpec};
pub use query::{paginate, ColumnMatch, ListQuery, Page};
pub use record::Record;
pub use store::{InMemoryRecordStore, RecordStore, StoreError, Write, WriteBatch};
pub use tx::RecordTx;
