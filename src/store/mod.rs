//! Persistence layer — staging store and relational warehouse.

pub mod staging;
pub mod traits;
pub mod warehouse;

pub use staging::LibSqlStagingStore;
pub use traits::{
    NewEmail, RecipientKind, RecipientRow, StagedRecord, StagingStore, UserRow, Warehouse,
};
pub use warehouse::LibSqlWarehouse;
