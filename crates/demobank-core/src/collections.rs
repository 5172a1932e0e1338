//! Record-level operations shared by every storage engine.
//!
//! Engines own persistence and locking; the rules for id assignment, email
//! uniqueness and transfers live here so each engine applies them the same way.

use rust_decimal::Decimal;
use time::OffsetDateTime;

use crate::models::{
    normalize_email,
    read::TransferReceipt,
    write::{
        AccountPatch, NewAccount, NewTransaction, NewUser, TransactionPatch, Transfer, UserPatch,
    },
    Account, Transaction, TransactionKind, TransactionStatus, User,
};
use crate::storage::{next_id, StorageError};

pub trait Record {
    fn id(&self) -> u64;
}

impl Record for Account {
    fn id(&self) -> u64 {
        self.id
    }
}

impl Record for Transaction {
    fn id(&self) -> u64 {
        self.id
    }
}

impl Record for User {
    fn id(&self) -> u64 {
        self.id
    }
}

fn next_record_id<R: Record>(records: &[R]) -> Result<u64, StorageError> {
    next_id(records.iter().map(Record::id))
}

fn find_mut<R: Record>(records: &mut [R], id: u64) -> Option<&mut R> {
    records.iter_mut().find(|r| r.id() == id)
}

fn remove<R: Record>(records: &mut Vec<R>, id: u64) -> Option<R> {
    let index = records.iter().position(|r| r.id() == id)?;
    Some(records.remove(index))
}

pub fn find<R: Record + Clone>(records: &[R], id: u64) -> Option<R> {
    records.iter().find(|r| r.id() == id).cloned()
}

pub fn insert_account(
    accounts: &mut Vec<Account>,
    new: NewAccount,
) -> Result<Account, StorageError> {
    let account = new.into_account(next_record_id(accounts)?);
    accounts.push(account.clone());
    Ok(account)
}

pub fn patch_account(
    accounts: &mut [Account],
    id: u64,
    patch: AccountPatch,
) -> Result<Account, StorageError> {
    let account = find_mut(accounts, id).ok_or(StorageError::AccountNotFound(id))?;
    patch.apply_to(account);
    Ok(account.clone())
}

pub fn remove_account(accounts: &mut Vec<Account>, id: u64) -> Result<Account, StorageError> {
    remove(accounts, id).ok_or(StorageError::AccountNotFound(id))
}

pub fn insert_transaction(
    transactions: &mut Vec<Transaction>,
    new: NewTransaction,
) -> Result<Transaction, StorageError> {
    let txn = new.into_transaction(next_record_id(transactions)?);
    transactions.push(txn.clone());
    Ok(txn)
}

pub fn patch_transaction(
    transactions: &mut [Transaction],
    id: u64,
    patch: TransactionPatch,
) -> Result<Transaction, StorageError> {
    let txn = find_mut(transactions, id).ok_or(StorageError::TransactionNotFound(id))?;
    patch.apply_to(txn);
    Ok(txn.clone())
}

pub fn remove_transaction(
    transactions: &mut Vec<Transaction>,
    id: u64,
) -> Result<Transaction, StorageError> {
    remove(transactions, id).ok_or(StorageError::TransactionNotFound(id))
}

pub fn find_user_by_email(users: &[User], email: &str) -> Option<User> {
    let wanted = normalize_email(email);
    users.iter().find(|u| normalize_email(&u.email) == wanted).cloned()
}

fn email_taken(users: &[User], email: &str, except: Option<u64>) -> bool {
    let wanted = normalize_email(email);
    users
        .iter()
        .any(|u| Some(u.id) != except && normalize_email(&u.email) == wanted)
}

pub fn insert_user(users: &mut Vec<User>, new: NewUser) -> Result<User, StorageError> {
    if email_taken(users, &new.email, None) {
        return Err(StorageError::DuplicateEmail(new.email.trim().to_string()));
    }
    let id = match new.id {
        Some(id) if users.iter().any(|u| u.id == id) => return Err(StorageError::DuplicateId(id)),
        Some(id) => id,
        None => next_record_id(users)?,
    };
    let user = new.into_user(id);
    users.push(user.clone());
    Ok(user)
}

pub fn patch_user(users: &mut [User], id: u64, patch: UserPatch) -> Result<User, StorageError> {
    if let Some(email) = &patch.email {
        if email_taken(users, email, Some(id)) {
            return Err(StorageError::DuplicateEmail(email.trim().to_string()));
        }
    }
    let user = find_mut(users, id).ok_or(StorageError::UserNotFound(id))?;
    patch.apply_to(user);
    Ok(user.clone())
}

pub fn remove_user(users: &mut Vec<User>, id: u64) -> Result<User, StorageError> {
    remove(users, id).ok_or(StorageError::UserNotFound(id))
}

/// `YYYY-MM-DD` and `HH:MM`, the same shapes the stored transactions use.
pub fn stamp(at: OffsetDateTime) -> (String, String) {
    let date = format!("{:04}-{:02}-{:02}", at.year(), u8::from(at.month()), at.day());
    let time = format!("{:02}:{:02}", at.hour(), at.minute());
    (date, time)
}

/// Validates and applies a transfer. Nothing is modified unless every check
/// passes. The debit leg is recorded with a negative amount.
pub fn apply_transfer(
    accounts: &mut [Account],
    transactions: &mut Vec<Transaction>,
    transfer: &Transfer,
    at: OffsetDateTime,
) -> Result<TransferReceipt, StorageError> {
    if transfer.amount <= Decimal::ZERO {
        return Err(StorageError::InvalidTransfer("amount must be positive".to_string()));
    }
    if transfer.from_account_id == transfer.to_account_id {
        return Err(StorageError::InvalidTransfer(
            "source and destination accounts must differ".to_string(),
        ));
    }

    let from = find(accounts, transfer.from_account_id)
        .ok_or(StorageError::AccountNotFound(transfer.from_account_id))?;
    let to = find(accounts, transfer.to_account_id)
        .ok_or(StorageError::AccountNotFound(transfer.to_account_id))?;

    if !from.kind.allows_overdraft() && from.balance < transfer.amount {
        return Err(StorageError::InsufficientFunds {
            account_id: from.id,
            balance: from.balance,
            requested: transfer.amount,
        });
    }

    let out_of_range =
        || StorageError::InvalidTransfer("resulting balance is out of range".to_string());
    let mut from_after = from;
    from_after.balance = from_after.balance.checked_sub(transfer.amount).ok_or_else(out_of_range)?;
    let mut to_after = to;
    to_after.balance = to_after.balance.checked_add(transfer.amount).ok_or_else(out_of_range)?;

    let first_id = next_record_id(transactions)?;
    let second_id = first_id.checked_add(1).ok_or(StorageError::IdsExhausted(first_id))?;

    let (date, time) = stamp(at);
    let memo = transfer.memo.as_deref().map(str::trim).filter(|m| !m.is_empty());

    let debit = Transaction {
        id: first_id,
        name: memo.map_or_else(|| format!("Transfer to {}", to_after.name), str::to_string),
        amount: -transfer.amount,
        date: date.clone(),
        time: time.clone(),
        category: "Transfer".to_string(),
        status: TransactionStatus::Completed,
        merchant: to_after.name.clone(),
        kind: TransactionKind::Debit,
        account_id: Some(from_after.id),
    };
    let credit = Transaction {
        id: second_id,
        name: memo.map_or_else(|| format!("Transfer from {}", from_after.name), str::to_string),
        amount: transfer.amount,
        date,
        time,
        category: "Transfer".to_string(),
        status: TransactionStatus::Completed,
        merchant: from_after.name.clone(),
        kind: TransactionKind::Credit,
        account_id: Some(to_after.id),
    };

    for account in accounts.iter_mut() {
        if account.id == from_after.id {
            account.balance = from_after.balance;
        } else if account.id == to_after.id {
            account.balance = to_after.balance;
        }
    }
    transactions.push(debit.clone());
    transactions.push(credit.clone());

    Ok(TransferReceipt {
        from: from_after,
        to: to_after,
        debit,
        credit,
    })
}
