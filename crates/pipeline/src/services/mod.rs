//! External collaborator traits and their in-memory test doubles.
//!
//! The warehouse, email provider, secret store, and object store are
//! external systems per the pipeline's contract; each is a trait with a
//! production implementation living in the binary crate and an in-memory
//! double used by the test suites.

pub mod email;
pub mod secrets;
pub mod storage;
pub mod warehouse;

pub use email::{
    EmailError, EmailMessage, EmailProvider, InMemoryEmailProvider, SendResponse, SuppressionGroup,
};
pub use secrets::{InMemorySecretStore, SecretError, SecretStore};
pub use storage::{InMemoryObjectStore, ObjectStore, StorageError};
pub use warehouse::{InMemoryWarehouse, Row, Warehouse, WarehouseError, WarehouseTables};
