use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Account, AccountKind, Role, Transaction, TransactionKind, TransactionStatus, User};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAccount {
    pub name: String,
    pub number: String,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub balance: Decimal,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub interest_rate: Decimal,
    #[serde(default)]
    pub routing: String,
    #[serde(default)]
    pub opened_date: String,
    #[serde(rename = "type")]
    pub kind: AccountKind,
}

impl NewAccount {
    pub fn into_account(self, id: u64) -> Account {
        Account {
            id,
            name: self.name,
            number: self.number,
            balance: self.balance,
            interest_rate: self.interest_rate,
            routing: self.routing,
            opened_date: self.opened_date,
            kind: self.kind,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountPatch {
    pub name: Option<String>,
    pub number: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub balance: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub interest_rate: Option<Decimal>,
    pub routing: Option<String>,
    pub opened_date: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<AccountKind>,
}

impl AccountPatch {
    pub fn apply_to(self, account: &mut Account) {
        if let Some(v) = self.name {
            account.name = v;
        }
        if let Some(v) = self.number {
            account.number = v;
        }
        if let Some(v) = self.balance {
            account.balance = v;
        }
        if let Some(v) = self.interest_rate {
            account.interest_rate = v;
        }
        if let Some(v) = self.routing {
            account.routing = v;
        }
        if let Some(v) = self.opened_date {
            account.opened_date = v;
        }
        if let Some(v) = self.kind {
            account.kind = v;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub date: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub category: String,
    pub status: TransactionStatus,
    #[serde(default)]
    pub merchant: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    #[serde(default)]
    pub account_id: Option<u64>,
}

impl NewTransaction {
    pub fn into_transaction(self, id: u64) -> Transaction {
        Transaction {
            id,
            name: self.name,
            amount: self.amount,
            date: self.date,
            time: self.time,
            category: self.category,
            status: self.status,
            merchant: self.merchant,
            kind: self.kind,
            account_id: self.account_id,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPatch {
    pub name: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub amount: Option<Decimal>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub category: Option<String>,
    pub status: Option<TransactionStatus>,
    pub merchant: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<TransactionKind>,
    pub account_id: Option<u64>,
}

impl TransactionPatch {
    pub fn apply_to(self, txn: &mut Transaction) {
        if let Some(v) = self.name {
            txn.name = v;
        }
        if let Some(v) = self.amount {
            txn.amount = v;
        }
        if let Some(v) = self.date {
            txn.date = v;
        }
        if let Some(v) = self.time {
            txn.time = v;
        }
        if let Some(v) = self.category {
            txn.category = v;
        }
        if let Some(v) = self.status {
            txn.status = v;
        }
        if let Some(v) = self.merchant {
            txn.merchant = v;
        }
        if let Some(v) = self.kind {
            txn.kind = v;
        }
        if let Some(v) = self.account_id {
            txn.account_id = Some(v);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    /// Explicit id; assigned by storage when absent.
    #[serde(default)]
    pub id: Option<u64>,
    pub email: String,
    pub password: String,
    pub name: String,
    #[serde(default = "default_role")]
    pub role: Role,
    #[serde(default)]
    pub phone: String,
}

fn default_role() -> Role {
    Role::User
}

impl NewUser {
    pub fn into_user(self, id: u64) -> User {
        User {
            id,
            email: self.email.trim().to_string(),
            password: self.password,
            name: self.name,
            role: self.role,
            phone: self.phone,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub role: Option<Role>,
    pub phone: Option<String>,
}

impl UserPatch {
    pub fn apply_to(self, user: &mut User) {
        if let Some(v) = self.email {
            user.email = v.trim().to_string();
        }
        if let Some(v) = self.password {
            user.password = v;
        }
        if let Some(v) = self.name {
            user.name = v;
        }
        if let Some(v) = self.role {
            user.role = v;
        }
        if let Some(v) = self.phone {
            user.phone = v;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    pub from_account_id: u64,
    pub to_account_id: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(default)]
    pub memo: Option<String>,
}
