//! Core types and traits for DemoBank storage backends.
//!
//! This crate provides the `StorageBackend` trait and the banking records it
//! stores, so storage engines can live in separate crates.

pub mod collections;
pub mod models;
pub mod storage;

// Re-export key types at crate root for convenience
pub use models::{
    Account, AccountKind, Role, Transaction, TransactionKind, TransactionStatus, User, UserView,
};
pub use models::write::{
    AccountPatch, NewAccount, NewTransaction, NewUser, Transfer, TransactionPatch, UserPatch,
};
pub use models::read::{Backup, BackupInfo, Collections, TransferReceipt};
pub use storage::{next_id, StorageBackend, StorageError};
