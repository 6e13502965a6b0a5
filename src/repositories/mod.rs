pub mod ledger_repository;

#[cfg(test)]
pub use ledger_repository::MockEntryStore;
pub use ledger_repository::{EntryStore, InMemoryEntryStore, LedgerHead, StoreStats};
