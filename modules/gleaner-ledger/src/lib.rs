pub mod ledger;
pub mod postgres;
pub mod store;

pub use ledger::Ledger;
pub use postgres::PgSeenStore;
pub use store::{MemorySeenStore, SeenStore};
