use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{Account, Transaction, User};

/// The three record collections, as they are held in storage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Collections {
    pub accounts: Vec<Account>,
    pub transactions: Vec<Transaction>,
    pub users: Vec<User>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    pub id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub accounts: Vec<Account>,
    pub transactions: Vec<Transaction>,
    pub users: Vec<User>,
}

impl Backup {
    pub fn new(id: String, created_at: OffsetDateTime, data: Collections) -> Self {
        Self {
            id,
            created_at,
            accounts: data.accounts,
            transactions: data.transactions,
            users: data.users,
        }
    }

    pub fn info(&self) -> BackupInfo {
        BackupInfo {
            id: self.id.clone(),
            created_at: self.created_at,
            accounts: self.accounts.len(),
            transactions: self.transactions.len(),
            users: self.users.len(),
        }
    }

    pub fn into_collections(self) -> Collections {
        Collections {
            accounts: self.accounts,
            transactions: self.transactions,
            users: self.users,
        }
    }
}

/// Backup metadata with per-collection record counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupInfo {
    pub id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub accounts: usize,
    pub transactions: usize,
    pub users: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferReceipt {
    pub from: Account,
    pub to: Account,
    pub debit: Transaction,
    pub credit: Transaction,
}
