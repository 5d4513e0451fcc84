pub mod journal;
pub mod snapshot;
pub mod store;

// Re-export the main types for convenience
pub use journal::{FileLedgerJournal, JournalEntry, LedgerJournal};
pub use snapshot::LedgerSnapshot;
pub use store::{LedgerDelta, LedgerEffect, LedgerRead, LedgerState, LedgerTransaction, LedgerWrite};
