use rust_decimal::Decimal;
use thiserror::Error;
use time::OffsetDateTime;

use crate::models::{
    read::{Backup, BackupInfo, TransferReceipt},
    write::{
        AccountPatch, NewAccount, NewTransaction, NewUser, TransactionPatch, Transfer, UserPatch,
    },
    Account, Transaction, User,
};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("account not found: {0}")]
    AccountNotFound(u64),
    #[error("transaction not found: {0}")]
    TransactionNotFound(u64),
    #[error("user not found: {0}")]
    UserNotFound(u64),
    #[error("backup not found: {0}")]
    BackupNotFound(String),
    #[error("email already registered: {0}")]
    DuplicateEmail(String),
    #[error("id already in use: {0}")]
    DuplicateId(u64),
    #[error("insufficient funds in account {account_id}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        account_id: u64,
        balance: Decimal,
        requested: Decimal,
    },
    #[error("no ids left after {0}")]
    IdsExhausted(u64),
    #[error("invalid transfer: {0}")]
    InvalidTransfer(String),
    #[error("{0}")]
    Other(String),
}

/// Next id for a collection: one past the largest id in use, starting at 1.
pub fn next_id<I: IntoIterator<Item = u64>>(ids: I) -> Result<u64, StorageError> {
    match ids.into_iter().max() {
        Some(max) => max.checked_add(1).ok_or(StorageError::IdsExhausted(max)),
        None => Ok(1),
    }
}

pub trait StorageBackend: Send + Sync {
    // Accounts
    fn list_accounts(&self) -> Result<Vec<Account>, StorageError>;
    fn get_account(&self, id: u64) -> Result<Account, StorageError>;
    fn create_account(&self, account: NewAccount) -> Result<Account, StorageError>;
    fn update_account(&self, id: u64, patch: AccountPatch) -> Result<Account, StorageError>;
    fn delete_account(&self, id: u64) -> Result<Account, StorageError>;

    // Transactions
    fn list_transactions(&self) -> Result<Vec<Transaction>, StorageError>;
    fn get_transaction(&self, id: u64) -> Result<Transaction, StorageError>;
    fn create_transaction(&self, txn: NewTransaction) -> Result<Transaction, StorageError>;
    fn update_transaction(
        &self,
        id: u64,
        patch: TransactionPatch,
    ) -> Result<Transaction, StorageError>;
    fn delete_transaction(&self, id: u64) -> Result<Transaction, StorageError>;

    // Users
    fn list_users(&self) -> Result<Vec<User>, StorageError>;
    fn get_user(&self, id: u64) -> Result<User, StorageError>;
    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StorageError>;
    fn create_user(&self, user: NewUser) -> Result<User, StorageError>;
    fn update_user(&self, id: u64, patch: UserPatch) -> Result<User, StorageError>;
    fn delete_user(&self, id: u64) -> Result<User, StorageError>;

    /// Moves money between two accounts and records both legs, all or nothing.
    fn transfer(
        &self,
        transfer: &Transfer,
        at: OffsetDateTime,
    ) -> Result<TransferReceipt, StorageError>;

    // Backups
    fn create_backup(&self) -> Result<BackupInfo, StorageError>;
    fn list_backups(&self) -> Result<Vec<BackupInfo>, StorageError>;
    fn get_backup(&self, id: &str) -> Result<Backup, StorageError>;
    fn restore_backup(&self, id: &str) -> Result<BackupInfo, StorageError>;
    fn delete_backup(&self, id: &str) -> Result<BackupInfo, StorageError>;
}
