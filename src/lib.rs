//! DemoBank: a demonstration online-banking backend.
//!
//! Accounts, transactions and users live in flat JSON files and are served
//! over a small REST API. Sign-in is a password check followed by a 4-digit
//! one-time passcode.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod otp;
pub mod session;
pub mod sorting;
pub mod storage;
pub mod telemetry;
