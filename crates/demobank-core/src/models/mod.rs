use std::fmt::Display;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub mod read;
pub mod write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Checking,
    Savings,
    Credit,
    Investment,
}

impl AccountKind {
    /// Credit lines may be drawn below zero; every other kind must stay covered.
    pub fn allows_overdraft(&self) -> bool {
        matches!(self, AccountKind::Credit)
    }
}

impl Display for AccountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AccountKind::Checking => "checking",
            AccountKind::Savings => "savings",
            AccountKind::Credit => "credit",
            AccountKind::Investment => "investment",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: u64,
    pub name: String,
    pub number: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub interest_rate: Decimal,
    pub routing: String,
    pub opened_date: String,
    #[serde(rename = "type")]
    pub kind: AccountKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Completed,
    Pending,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Credit,
    Debit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: u64,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub date: String,
    pub time: String,
    pub category: String,
    pub status: TransactionStatus,
    pub merchant: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: u64,
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: Role,
    pub phone: String,
}

impl User {
    pub fn view(&self) -> UserView {
        UserView::from(self)
    }
}

/// A user as returned over the API; the password stays in storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: u64,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub phone: String,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            phone: user.phone.clone(),
        }
    }
}

/// Canonical form used for email uniqueness and lookups.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
