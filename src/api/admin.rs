use axum::{extract::State, http::StatusCode, Json};

use demobank_core::{
    Account, AccountPatch, Backup, BackupInfo, NewAccount, NewUser, UserPatch, UserView,
};

use crate::error::ApiError;

use super::{
    created, ok, require_email, require_non_empty, ApiJson, ApiPath, ApiResponse, ApiResult,
    AppState,
};

type Created<T> = Result<(StatusCode, Json<ApiResponse<T>>), ApiError>;

// Accounts

pub async fn list_accounts(State(state): State<AppState>) -> ApiResult<Vec<Account>> {
    Ok(ok(state.run(|s| s.list_accounts()).await?))
}

pub async fn get_account(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<Account> {
    Ok(ok(state.run(move |s| s.get_account(id)).await?))
}

pub async fn create_account(
    State(state): State<AppState>,
    ApiJson(account): ApiJson<NewAccount>,
) -> Created<Account> {
    require_non_empty("name", &account.name)?;
    let account = state.run(move |s| s.create_account(account)).await?;
    tracing::info!(id = account.id, kind = %account.kind, "Account created");
    Ok(created(account))
}

pub async fn update_account(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
    ApiJson(patch): ApiJson<AccountPatch>,
) -> ApiResult<Account> {
    if let Some(name) = &patch.name {
        require_non_empty("name", name)?;
    }
    Ok(ok(state.run(move |s| s.update_account(id, patch)).await?))
}

pub async fn delete_account(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<Account> {
    let account = state.run(move |s| s.delete_account(id)).await?;
    tracing::info!(id, "Account deleted");
    Ok(ok(account))
}

// Users

pub async fn list_users(State(state): State<AppState>) -> ApiResult<Vec<UserView>> {
    let users = state.run(|s| s.list_users()).await?;
    Ok(ok(users.iter().map(UserView::from).collect()))
}

pub async fn get_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<UserView> {
    Ok(ok(state.run(move |s| s.get_user(id)).await?.view()))
}

pub async fn create_user(
    State(state): State<AppState>,
    ApiJson(user): ApiJson<NewUser>,
) -> Created<UserView> {
    require_email(&user.email)?;
    require_non_empty("password", &user.password)?;
    require_non_empty("name", &user.name)?;
    let user = state.run(move |s| s.create_user(user)).await?;
    tracing::info!(id = user.id, "User created");
    Ok(created(user.view()))
}

pub async fn update_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
    ApiJson(patch): ApiJson<UserPatch>,
) -> ApiResult<UserView> {
    if let Some(email) = &patch.email {
        require_email(email)?;
    }
    if let Some(password) = &patch.password {
        require_non_empty("password", password)?;
    }
    let role_changed = patch.role.is_some();
    let user = state.run(move |s| s.update_user(id, patch)).await?;
    if role_changed {
        state.sessions.revoke_user(id);
    }
    Ok(ok(user.view()))
}

pub async fn delete_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<UserView> {
    let user = state.run(move |s| s.delete_user(id)).await?;
    let ended = state.sessions.revoke_user(id);
    tracing::info!(id, sessions_ended = ended, "User deleted");
    Ok(ok(user.view()))
}

// Backups

pub async fn list_backups(State(state): State<AppState>) -> ApiResult<Vec<BackupInfo>> {
    Ok(ok(state.run(|s| s.list_backups()).await?))
}

pub async fn create_backup(State(state): State<AppState>) -> Created<BackupInfo> {
    Ok(created(state.run(|s| s.create_backup()).await?))
}

pub async fn get_backup(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Backup> {
    Ok(ok(state.run(move |s| s.get_backup(&id)).await?))
}

pub async fn restore_backup(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<BackupInfo> {
    let info = state.run(move |s| s.restore_backup(&id)).await?;
    // Restored users may have other roles or be gone; sessions cache both.
    let ended = state.sessions.clear();
    tracing::warn!(backup_id = %info.id, sessions_ended = ended, "Data restored from backup");
    Ok(ok(info))
}

pub async fn delete_backup(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<BackupInfo> {
    Ok(ok(state.run(move |s| s.delete_backup(&id)).await?))
}
