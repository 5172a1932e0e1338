use axum::{extract::State, http::StatusCode, Json};
use rust_decimal::Decimal;
use time::OffsetDateTime;

use demobank_core::{Transfer, TransferReceipt};

use crate::error::ApiError;

use super::{created, ApiJson, ApiResponse, AppState};

pub async fn create_transfer(
    State(state): State<AppState>,
    ApiJson(transfer): ApiJson<Transfer>,
) -> Result<(StatusCode, Json<ApiResponse<TransferReceipt>>), ApiError> {
    if transfer.amount <= Decimal::ZERO {
        return Err(ApiError::BadRequest("amount must be greater than zero".to_string()));
    }

    let receipt = state
        .run(move |s| s.transfer(&transfer, OffsetDateTime::now_utc()))
        .await?;

    metrics::increment_counter!("transfers_total");
    tracing::info!(
        from = receipt.from.id,
        to = receipt.to.id,
        amount = %receipt.credit.amount,
        "Transfer completed"
    );
    Ok(created(receipt))
}
