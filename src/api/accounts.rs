use axum::extract::State;

use demobank_core::{Account, Transaction};

use crate::sorting::{sort_transactions, SortOrder};

use super::{ok, ApiPath, ApiResult, AppState};

pub async fn list_accounts(State(state): State<AppState>) -> ApiResult<Vec<Account>> {
    Ok(ok(state.run(|s| s.list_accounts()).await?))
}

pub async fn get_account(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<Account> {
    Ok(ok(state.run(move |s| s.get_account(id)).await?))
}

/// Transactions posted against one account, newest first.
pub async fn account_transactions(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<Vec<Transaction>> {
    let mut txns = state
        .run(move |s| {
            s.get_account(id)?;
            Ok(s.list_transactions()?
                .into_iter()
                .filter(|t| t.account_id == Some(id))
                .collect::<Vec<_>>())
        })
        .await?;
    sort_transactions(&mut txns, SortOrder::Newest);
    Ok(ok(txns))
}
