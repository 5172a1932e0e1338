//! In-memory storage backend for DemoBank.

use std::{
    collections::BTreeMap,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use time::OffsetDateTime;
use uuid::Uuid;

use demobank_core::{
    collections, Account, AccountPatch, Backup, BackupInfo, Collections, NewAccount,
    NewTransaction, NewUser, StorageBackend, StorageError, Transaction, TransactionPatch, Transfer,
    TransferReceipt, User, UserPatch,
};

pub struct MemoryStorage {
    data: RwLock<Collections>,
    backups: RwLock<BTreeMap<String, Backup>>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::with_data(Collections::default())
    }

    pub fn with_data(data: Collections) -> Self {
        Self {
            data: RwLock::new(data),
            backups: RwLock::new(BTreeMap::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Collections>, StorageError> {
        self.data.read().map_err(|_| StorageError::Other("storage lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Collections>, StorageError> {
        self.data.write().map_err(|_| StorageError::Other("storage lock poisoned".to_string()))
    }

    fn backups_read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<String, Backup>>, StorageError> {
        self.backups.read().map_err(|_| StorageError::Other("backup lock poisoned".to_string()))
    }

    fn backups_write(
        &self,
    ) -> Result<RwLockWriteGuard<'_, BTreeMap<String, Backup>>, StorageError> {
        self.backups.write().map_err(|_| StorageError::Other("backup lock poisoned".to_string()))
    }
}

impl StorageBackend for MemoryStorage {
    fn list_accounts(&self) -> Result<Vec<Account>, StorageError> {
        Ok(self.read()?.accounts.clone())
    }

    fn get_account(&self, id: u64) -> Result<Account, StorageError> {
        collections::find(&self.read()?.accounts, id).ok_or(StorageError::AccountNotFound(id))
    }

    fn create_account(&self, account: NewAccount) -> Result<Account, StorageError> {
        let account = collections::insert_account(&mut self.write()?.accounts, account)?;
        tracing::debug!(id = account.id, "Account created");
        Ok(account)
    }

    fn update_account(&self, id: u64, patch: AccountPatch) -> Result<Account, StorageError> {
        collections::patch_account(&mut self.write()?.accounts, id, patch)
    }

    fn delete_account(&self, id: u64) -> Result<Account, StorageError> {
        collections::remove_account(&mut self.write()?.accounts, id)
    }

    fn list_transactions(&self) -> Result<Vec<Transaction>, StorageError> {
        Ok(self.read()?.transactions.clone())
    }

    fn get_transaction(&self, id: u64) -> Result<Transaction, StorageError> {
        collections::find(&self.read()?.transactions, id)
            .ok_or(StorageError::TransactionNotFound(id))
    }

    fn create_transaction(&self, txn: NewTransaction) -> Result<Transaction, StorageError> {
        collections::insert_transaction(&mut self.write()?.transactions, txn)
    }

    fn update_transaction(
        &self,
        id: u64,
        patch: TransactionPatch,
    ) -> Result<Transaction, StorageError> {
        collections::patch_transaction(&mut self.write()?.transactions, id, patch)
    }

    fn delete_transaction(&self, id: u64) -> Result<Transaction, StorageError> {
        collections::remove_transaction(&mut self.write()?.transactions, id)
    }

    fn list_users(&self) -> Result<Vec<User>, StorageError> {
        Ok(self.read()?.users.clone())
    }

    fn get_user(&self, id: u64) -> Result<User, StorageError> {
        collections::find(&self.read()?.users, id).ok_or(StorageError::UserNotFound(id))
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StorageError> {
        Ok(collections::find_user_by_email(&self.read()?.users, email))
    }

    fn create_user(&self, user: NewUser) -> Result<User, StorageError> {
        collections::insert_user(&mut self.write()?.users, user)
    }

    fn update_user(&self, id: u64, patch: UserPatch) -> Result<User, StorageError> {
        collections::patch_user(&mut self.write()?.users, id, patch)
    }

    fn delete_user(&self, id: u64) -> Result<User, StorageError> {
        collections::remove_user(&mut self.write()?.users, id)
    }

    fn transfer(
        &self,
        transfer: &Transfer,
        at: OffsetDateTime,
    ) -> Result<TransferReceipt, StorageError> {
        let mut data = self.write()?;
        let Collections { accounts, transactions, .. } = &mut *data;
        collections::apply_transfer(accounts, transactions, transfer, at)
    }

    fn create_backup(&self) -> Result<BackupInfo, StorageError> {
        let snapshot = self.read()?.clone();
        let backup = Backup::new(Uuid::new_v4().to_string(), OffsetDateTime::now_utc(), snapshot);
        let info = backup.info();
        self.backups_write()?.insert(backup.id.clone(), backup);
        tracing::debug!(backup_id = %info.id, "Backup created");
        Ok(info)
    }

    fn list_backups(&self) -> Result<Vec<BackupInfo>, StorageError> {
        let mut infos: Vec<BackupInfo> = self.backups_read()?.values().map(Backup::info).collect();
        infos.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(infos)
    }

    fn get_backup(&self, id: &str) -> Result<Backup, StorageError> {
        self.backups_read()?
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::BackupNotFound(id.to_string()))
    }

    fn restore_backup(&self, id: &str) -> Result<BackupInfo, StorageError> {
        let backup = self.get_backup(id)?;
        let info = backup.info();
        *self.write()? = backup.into_collections();
        tracing::debug!(backup_id = %id, "Backup restored");
        Ok(info)
    }

    fn delete_backup(&self, id: &str) -> Result<BackupInfo, StorageError> {
        self.backups_write()?
            .remove(id)
            .map(|b| b.info())
            .ok_or_else(|| StorageError::BackupNotFound(id.to_string()))
    }
}
