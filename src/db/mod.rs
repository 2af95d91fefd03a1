pub mod connection;
pub mod errors;
pub mod memory;
pub mod read_ops;
pub mod store;
pub mod write_ops;

pub use connection::{create_pool, run_migrations, with_retry};
pub use errors::*;
pub use memory::MemoryShareStore;
pub use store::{PgShareStore, ShareStore};
