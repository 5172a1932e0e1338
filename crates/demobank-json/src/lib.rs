//! Flat JSON file storage backend for DemoBank.
//!
//! Each collection is a JSON array in its own file under the data directory.
//! Every mutation is a full read-modify-write of the affected files, serialized
//! through one lock and written via a temporary file that is renamed over the
//! target, so readers never observe a half-written file. Changes that span
//! several files (transfers, restores) stage every file before the first
//! rename and put earlier files back if a later rename fails.

use std::{
    fs,
    io::{BufWriter, ErrorKind, Write},
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use serde::{de::DeserializeOwned, Serialize};
use tempfile::NamedTempFile;
use time::OffsetDateTime;
use uuid::Uuid;

use demobank_core::{
    collections, Account, AccountPatch, Backup, BackupInfo, Collections, NewAccount,
    NewTransaction, NewUser, StorageBackend, StorageError, Transaction, TransactionPatch, Transfer,
    TransferReceipt, User, UserPatch,
};

pub const ACCOUNTS_FILE: &str = "accounts.json";
pub const TRANSACTIONS_FILE: &str = "transactions.json";
pub const USERS_FILE: &str = "users.json";
pub const BACKUP_DIR: &str = "backups";

/// Backup ids become file names, so only a conservative character set is allowed.
fn is_safe_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

pub struct JsonFileStorage {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStorage {
    /// Opens (creating if needed) a data directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(dir.join(BACKUP_DIR))?;
        tracing::info!(dir = %dir.display(), "Using JSON file storage");
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>, StorageError> {
        self.write_lock
            .lock()
            .map_err(|_| StorageError::Other("storage lock poisoned".to_string()))
    }

    fn backup_path(&self, id: &str) -> Result<PathBuf, StorageError> {
        if !is_safe_identifier(id) {
            return Err(StorageError::BackupNotFound(id.to_string()));
        }
        Ok(self.dir.join(BACKUP_DIR).join(format!("{}.json", id)))
    }

    /// Reads a collection file. A missing file is created as an empty array.
    fn load<T: DeserializeOwned>(&self, file: &str) -> Result<Vec<T>, StorageError> {
        let path = self.dir.join(file);
        match fs::read(&path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(file, "Collection file missing, creating empty");
                create_empty(&path)?;
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn save<T: Serialize>(&self, file: &str, records: &[T]) -> Result<(), StorageError> {
        write_atomic(&self.dir.join(file), &records)
    }

    /// Stages a rewrite of one collection file without touching the file itself.
    fn pending<T: Serialize>(
        &self,
        file: &str,
        records: &[T],
    ) -> Result<PendingWrite, StorageError> {
        let path = self.dir.join(file);
        let previous = match fs::read(&path) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        let tmp = stage(&path, &serde_json::to_vec_pretty(records)?)?;
        Ok(PendingWrite { path, tmp, previous })
    }

    /// Read-modify-write of one collection under the write lock. The file is
    /// only rewritten when `f` succeeds.
    fn mutate<T, R, F>(&self, file: &str, f: F) -> Result<R, StorageError>
    where
        T: DeserializeOwned + Serialize,
        F: FnOnce(&mut Vec<T>) -> Result<R, StorageError>,
    {
        let _guard = self.lock()?;
        let mut records = self.load::<T>(file)?;
        let result = f(&mut records)?;
        self.save(file, &records)?;
        Ok(result)
    }

    fn load_all(&self) -> Result<Collections, StorageError> {
        Ok(Collections {
            accounts: self.load(ACCOUNTS_FILE)?,
            transactions: self.load(TRANSACTIONS_FILE)?,
            users: self.load(USERS_FILE)?,
        })
    }

    fn read_backup(&self, path: &Path, id: &str) -> Result<Backup, StorageError> {
        match fs::read(path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::BackupNotFound(id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Writes `[]` to `path` unless some other caller created the file first.
fn create_empty(path: &Path) -> Result<(), StorageError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(b"[]")?;
    tmp.as_file().sync_all()?;
    match tmp.persist_noclobber(path) {
        Ok(_) => Ok(()),
        Err(e) if e.error.kind() == ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(StorageError::Io(e.error)),
    }
}

/// Writes `contents` to a synced temporary file next to `path`.
fn stage(path: &Path, contents: &[u8]) -> Result<NamedTempFile, StorageError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        writer.write_all(contents)?;
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    Ok(tmp)
}

fn write_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StorageError> {
    let tmp = stage(path, &serde_json::to_vec_pretty(value)?)?;
    tmp.persist(path).map_err(|e| StorageError::Io(e.error))?;
    Ok(())
}

/// A staged replacement plus the bytes it replaces (`None` when the file
/// did not exist).
struct PendingWrite {
    path: PathBuf,
    tmp: NamedTempFile,
    previous: Option<Vec<u8>>,
}

/// Renames staged files into place in order. When a rename fails, the files
/// already replaced get their previous contents back.
fn commit(writes: Vec<PendingWrite>) -> Result<(), StorageError> {
    let mut done: Vec<(PathBuf, Option<Vec<u8>>)> = Vec::with_capacity(writes.len());
    for PendingWrite { path, tmp, previous } in writes {
        if let Err(e) = tmp.persist(&path) {
            for (path, previous) in done.iter().rev() {
                if let Err(undo) = roll_back(path, previous.as_deref()) {
                    tracing::error!(
                        path = %path.display(),
                        error = %undo,
                        "Failed to roll back file"
                    );
                }
            }
            return Err(StorageError::Io(e.error));
        }
        done.push((path, previous));
    }
    Ok(())
}

fn roll_back(path: &Path, previous: Option<&[u8]>) -> Result<(), StorageError> {
    match previous {
        Some(bytes) => {
            stage(path, bytes)?
                .persist(path)
                .map_err(|e| StorageError::Io(e.error))?;
        }
        None => fs::remove_file(path)?,
    }
    Ok(())
}

impl StorageBackend for JsonFileStorage {
    fn list_accounts(&self) -> Result<Vec<Account>, StorageError> {
        self.load(ACCOUNTS_FILE)
    }

    fn get_account(&self, id: u64) -> Result<Account, StorageError> {
        collections::find(&self.load::<Account>(ACCOUNTS_FILE)?, id)
            .ok_or(StorageError::AccountNotFound(id))
    }

    fn create_account(&self, account: NewAccount) -> Result<Account, StorageError> {
        let account =
            self.mutate(ACCOUNTS_FILE, |accounts| collections::insert_account(accounts, account))?;
        tracing::debug!(id = account.id, "Account created");
        Ok(account)
    }

    fn update_account(&self, id: u64, patch: AccountPatch) -> Result<Account, StorageError> {
        self.mutate(ACCOUNTS_FILE, |accounts| collections::patch_account(accounts, id, patch))
    }

    fn delete_account(&self, id: u64) -> Result<Account, StorageError> {
        self.mutate(ACCOUNTS_FILE, |accounts| collections::remove_account(accounts, id))
    }

    fn list_transactions(&self) -> Result<Vec<Transaction>, StorageError> {
        self.load(TRANSACTIONS_FILE)
    }

    fn get_transaction(&self, id: u64) -> Result<Transaction, StorageError> {
        collections::find(&self.load::<Transaction>(TRANSACTIONS_FILE)?, id)
            .ok_or(StorageError::TransactionNotFound(id))
    }

    fn create_transaction(&self, txn: NewTransaction) -> Result<Transaction, StorageError> {
        self.mutate(TRANSACTIONS_FILE, |txns| collections::insert_transaction(txns, txn))
    }

    fn update_transaction(
        &self,
        id: u64,
        patch: TransactionPatch,
    ) -> Result<Transaction, StorageError> {
        self.mutate(TRANSACTIONS_FILE, |txns| collections::patch_transaction(txns, id, patch))
    }

    fn delete_transaction(&self, id: u64) -> Result<Transaction, StorageError> {
        self.mutate(TRANSACTIONS_FILE, |txns| collections::remove_transaction(txns, id))
    }

    fn list_users(&self) -> Result<Vec<User>, StorageError> {
        self.load(USERS_FILE)
    }

    fn get_user(&self, id: u64) -> Result<User, StorageError> {
        collections::find(&self.load::<User>(USERS_FILE)?, id).ok_or(StorageError::UserNotFound(id))
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StorageError> {
        Ok(collections::find_user_by_email(&self.load::<User>(USERS_FILE)?, email))
    }

    fn create_user(&self, user: NewUser) -> Result<User, StorageError> {
        self.mutate(USERS_FILE, |users| collections::insert_user(users, user))
    }

    fn update_user(&self, id: u64, patch: UserPatch) -> Result<User, StorageError> {
        self.mutate(USERS_FILE, |users| collections::patch_user(users, id, patch))
    }

    fn delete_user(&self, id: u64) -> Result<User, StorageError> {
        self.mutate(USERS_FILE, |users| collections::remove_user(users, id))
    }

    fn transfer(
        &self,
        transfer: &Transfer,
        at: OffsetDateTime,
    ) -> Result<TransferReceipt, StorageError> {
        let _guard = self.lock()?;
        let mut accounts: Vec<Account> = self.load(ACCOUNTS_FILE)?;
        let mut transactions: Vec<Transaction> = self.load(TRANSACTIONS_FILE)?;
        let receipt = collections::apply_transfer(&mut accounts, &mut transactions, transfer, at)?;
        commit(vec![
            self.pending(TRANSACTIONS_FILE, &transactions)?,
            self.pending(ACCOUNTS_FILE, &accounts)?,
        ])?;
        Ok(receipt)
    }

    fn create_backup(&self) -> Result<BackupInfo, StorageError> {
        let _guard = self.lock()?;
        let backup = Backup::new(
            Uuid::new_v4().to_string(),
            OffsetDateTime::now_utc(),
            self.load_all()?,
        );
        write_atomic(&self.backup_path(&backup.id)?, &backup)?;
        tracing::info!(backup_id = %backup.id, "Backup created");
        Ok(backup.info())
    }

    fn list_backups(&self) -> Result<Vec<BackupInfo>, StorageError> {
        let mut infos = Vec::new();
        for entry in fs::read_dir(self.dir.join(BACKUP_DIR))? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let bytes = fs::read(&path)?;
            match serde_json::from_slice::<Backup>(&bytes) {
                Ok(backup) => infos.push(backup.info()),
                Err(e) => tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Skipping unreadable backup"
                ),
            }
        }
        infos.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(infos)
    }

    fn get_backup(&self, id: &str) -> Result<Backup, StorageError> {
        let path = self.backup_path(id)?;
        self.read_backup(&path, id)
    }

    fn restore_backup(&self, id: &str) -> Result<BackupInfo, StorageError> {
        let _guard = self.lock()?;
        let backup = self.get_backup(id)?;
        let info = backup.info();
        let data = backup.into_collections();
        commit(vec![
            self.pending(ACCOUNTS_FILE, &data.accounts)?,
            self.pending(TRANSACTIONS_FILE, &data.transactions)?,
            self.pending(USERS_FILE, &data.users)?,
        ])?;
        tracing::info!(backup_id = %id, "Backup restored");
        Ok(info)
    }

    fn delete_backup(&self, id: &str) -> Result<BackupInfo, StorageError> {
        let _guard = self.lock()?;
        let path = self.backup_path(id)?;
        let info = self.read_backup(&path, id)?.info();
        fs::remove_file(&path)?;
        Ok(info)
    }
}
