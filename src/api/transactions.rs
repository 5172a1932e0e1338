use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;

use demobank_core::{NewTransaction, Transaction, TransactionPatch, TransactionStatus};

use crate::{
    error::ApiError,
    sorting::{sort_transactions, SortOrder},
};

use super::{
    created, ok, require_non_empty, ApiJson, ApiPath, ApiQuery, ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionQuery {
    pub account_id: Option<u64>,
    pub category: Option<String>,
    pub status: Option<TransactionStatus>,
    #[serde(default)]
    pub order: SortOrder,
    pub limit: Option<usize>,
}

impl TransactionQuery {
    fn matches(&self, txn: &Transaction) -> bool {
        if let Some(account_id) = self.account_id {
            if txn.account_id != Some(account_id) {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if !txn.category.eq_ignore_ascii_case(category.trim()) {
                return false;
            }
        }
        if let Some(status) = self.status {
            if txn.status != status {
                return false;
            }
        }
        true
    }

    /// Filters, sorts and truncates a transaction list.
    pub fn apply(&self, txns: Vec<Transaction>) -> Vec<Transaction> {
        let mut txns: Vec<Transaction> = txns.into_iter().filter(|t| self.matches(t)).collect();
        sort_transactions(&mut txns, self.order);
        if let Some(limit) = self.limit {
            txns.truncate(limit);
        }
        txns
    }
}

pub async fn list_transactions(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<TransactionQuery>,
) -> ApiResult<Vec<Transaction>> {
    let txns = state.run(|s| s.list_transactions()).await?;
    Ok(ok(query.apply(txns)))
}

pub async fn get_transaction(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<Transaction> {
    Ok(ok(state.run(move |s| s.get_transaction(id)).await?))
}

pub async fn create_transaction(
    State(state): State<AppState>,
    ApiJson(txn): ApiJson<NewTransaction>,
) -> Result<(StatusCode, Json<ApiResponse<Transaction>>), ApiError> {
    require_non_empty("name", &txn.name)?;
    let txn = state.run(move |s| s.create_transaction(txn)).await?;
    tracing::info!(id = txn.id, "Transaction created");
    Ok(created(txn))
}

pub async fn update_transaction(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
    ApiJson(patch): ApiJson<TransactionPatch>,
) -> ApiResult<Transaction> {
    if let Some(name) = &patch.name {
        require_non_empty("name", name)?;
    }
    Ok(ok(state.run(move |s| s.update_transaction(id, patch)).await?))
}

pub async fn delete_transaction(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<Transaction> {
    let txn = state.run(move |s| s.delete_transaction(id)).await?;
    tracing::info!(id, "Transaction deleted");
    Ok(ok(txn))
}
