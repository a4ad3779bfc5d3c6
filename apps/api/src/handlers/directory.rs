//! User and company handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use arendir_core::{Company, NewCompany, NewUser, User, UserRole, UserUpdate};
use arendir_db::UserWithPendingDocuments;

#[derive(Debug, Deserialize)]
pub struct UsersQuery {
    pub id_empresa: i64,
    #[serde(default)]
    pub role: Option<UserRole>,
}

#[derive(Debug, Deserialize)]
pub struct CompanyQuery {
    pub id_empresa: i64,
}

#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    pub email: String,
}

/// `POST /users/`
pub async fn create_user(
    State(state): State<AppState>,
    Json(new_user): Json<NewUser>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let user = state.db.users().create(&new_user).await?;
    info!(id = user.id, role = ?user.role, id_empresa = user.id_empresa, "User created");
    Ok((StatusCode::CREATED, Json(user)))
}

/// `GET /users/{id}`
pub async fn get_user(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<User>> {
    state
        .db
        .users()
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("User", id))
}

/// `PUT /users/{id}`
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(update): Json<UserUpdate>,
) -> ApiResult<Json<User>> {
    let user = state.db.users().update(id, &update).await?;
    info!(id, role = ?user.role, estado = user.estado, "User updated");
    Ok(Json(user))
}

/// `GET /users/by-email/?email=`
pub async fn user_by_email(
    State(state): State<AppState>,
    Query(query): Query<EmailQuery>,
) -> ApiResult<Json<User>> {
    state
        .db
        .users()
        .get_by_email(&query.email)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("User", query.email.trim()))
}

/// `GET /users/with-pending-documents/?id_empresa=`
pub async fn users_with_pending_documents(
    State(state): State<AppState>,
    Query(query): Query<CompanyQuery>,
) -> ApiResult<Json<Vec<UserWithPendingDocuments>>> {
    let users = state.db.users().with_pending_documents(query.id_empresa).await?;
    Ok(Json(users))
}

/// `GET /users/by-company-and-role/?id_empresa=&role=`
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UsersQuery>,
) -> ApiResult<Json<Vec<User>>> {
    let users = state.db.users().list(query.id_empresa, query.role).await?;
    Ok(Json(users))
}

/// `POST /companies/`
pub async fn create_company(
    State(state): State<AppState>,
    Json(new_company): Json<NewCompany>,
) -> ApiResult<(StatusCode, Json<Company>)> {
    let company = state.db.companies().create(&new_company).await?;
    info!(id = company.id, name = %company.name, "Company created");
    Ok((StatusCode::CREATED, Json(company)))
}

/// `GET /companies/{id}`
pub async fn get_company(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Company>> {
    state
        .db
        .companies()
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Company", id))
}

/// `PUT /companies/{id}`
pub async fn update_company(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(company): Json<NewCompany>,
) -> ApiResult<Json<Company>> {
    let company = state.db.companies().update(id, &company).await?;
    Ok(Json(company))
}

/// `DELETE /companies/{id}`
pub async fn delete_company(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.db.companies().delete(id).await?;
    info!(id, "Company deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /companies/`
pub async fn list_companies(State(state): State<AppState>) -> ApiResult<Json<Vec<Company>>> {
    Ok(Json(state.db.companies().list().await?))
}
