//! Ordering of transaction lists by their date and time strings.
//!
//! Stored transactions carry dates in one of two shapes: ISO (`2024-03-05`,
//! `14:30`) or display (`Mar 5, 2024`, `2:30 PM`). Date and time are parsed
//! independently, so mixed rows sort correctly too.

use std::cmp::Ordering;

use serde::Deserialize;
use time::{
    format_description::FormatItem, macros::format_description, Date, PrimitiveDateTime, Time,
};

use demobank_core::Transaction;

const ISO_DATE: &[FormatItem<'_>] = format_description!("[year]-[month]-[day]");
const SHORT_DATE: &[FormatItem<'_>] =
    format_description!("[month repr:short] [day padding:none], [year]");
const LONG_DATE: &[FormatItem<'_>] =
    format_description!("[month repr:long] [day padding:none], [year]");

const TIME_24: &[FormatItem<'_>] = format_description!("[hour padding:none]:[minute]");
const TIME_24_SECONDS: &[FormatItem<'_>] =
    format_description!("[hour padding:none]:[minute]:[second]");
const TIME_12: &[FormatItem<'_>] =
    format_description!("[hour repr:12 padding:none]:[minute] [period]");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    #[serde(alias = "desc")]
    Newest,
    #[serde(alias = "asc")]
    Oldest,
}

pub fn parse_date(date: &str) -> Option<Date> {
    let date = date.trim();
    [ISO_DATE, SHORT_DATE, LONG_DATE]
        .iter()
        .find_map(|format| Date::parse(date, format).ok())
}

/// An empty time means midnight.
pub fn parse_time(time: &str) -> Option<Time> {
    let time = time.trim();
    if time.is_empty() {
        return Some(Time::MIDNIGHT);
    }
    let upper = time.to_ascii_uppercase();
    [TIME_24, TIME_24_SECONDS]
        .iter()
        .find_map(|format| Time::parse(time, format).ok())
        .or_else(|| Time::parse(&upper, TIME_12).ok())
}

pub fn parse_timestamp(date: &str, time: &str) -> Option<PrimitiveDateTime> {
    Some(PrimitiveDateTime::new(parse_date(date)?, parse_time(time)?))
}

#[derive(Debug)]
struct SortKey {
    at: Option<PrimitiveDateTime>,
    id: u64,
    order: SortOrder,
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.at, other.at) {
            (Some(a), Some(b)) => match self.order {
                SortOrder::Newest => b.cmp(&a).then_with(|| other.id.cmp(&self.id)),
                SortOrder::Oldest => a.cmp(&b).then_with(|| self.id.cmp(&other.id)),
            },
            // Unparseable rows go last in either direction.
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

impl PartialEq for SortKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SortKey {}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Stable sort by timestamp, then id.
pub fn sort_transactions(transactions: &mut [Transaction], order: SortOrder) {
    transactions.sort_by_cached_key(|t| SortKey {
        at: parse_timestamp(&t.date, &t.time),
        id: t.id,
        order,
    });
}
