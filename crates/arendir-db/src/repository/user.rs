//! # User Repository
//!
//! Users and their credentials. Passwords are stored as argon2 PHC strings
//! and never leave this module.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, info};
use ts_rs::TS;

use super::document::DOCUMENT_SELECT;
use crate::error::{DbError, DbResult};
use arendir_core::validation::{validate_new_user, validate_user_update};
use arendir_core::{
    CoreError, DocumentStatus, Documento, NewUser, User, UserRole, UserUpdate, DEFAULT_COMPANY_ID,
};

const USER_COLUMNS: &str = "id, email, full_name, role, id_empresa, dni, cargo, ceco, gerencia, \
     area, banco, cuenta_bancaria, phone, estado";

/// A user with the documents still waiting for review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UserWithPendingDocuments {
    #[serde(flatten)]
    pub user: User,
    pub documentos: Vec<Documento>,
}

/// Repository for user database operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Creates a user after validating it and hashing its password.
    ///
    /// ## Errors
    /// - `Validation` for a malformed email, short password or bad DNI
    /// - `UniqueViolation` if the email is taken
    /// - `ForeignKeyViolation` if the company does not exist
    pub async fn create(&self, new_user: &NewUser) -> DbResult<User> {
        validate_new_user(new_user).map_err(CoreError::from)?;

        let email = new_user.email.trim().to_lowercase();
        let hashed = hash_password(&new_user.password)?;
        let role = new_user.role.unwrap_or_default();
        let id_empresa = new_user.id_empresa.unwrap_or(DEFAULT_COMPANY_ID);

        debug!(email = %email, role = ?role, "Creating user");

        let result = sqlx::query(
            r#"
            INSERT INTO users (
                email, full_name, hashed_password, role, id_empresa,
                dni, cargo, ceco, gerencia, area, banco, cuenta_bancaria, phone
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&email)
        .bind(new_user.full_name.trim())
        .bind(&hashed)
        .bind(role)
        .bind(id_empresa)
        .bind(&new_user.dni)
        .bind(&new_user.cargo)
        .bind(&new_user.ceco)
        .bind(&new_user.gerencia)
        .bind(&new_user.area)
        .bind(&new_user.banco)
        .bind(&new_user.cuenta_bancaria)
        .bind(&new_user.phone)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("email", email.clone()),
            other => other,
        })?;

        let id = result.last_insert_rowid();
        info!(user_id = id, "User created");

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("User", id))
    }

    /// Gets a user by id.
    pub async fn get(&self, id: i64) -> DbResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Gets a user by email, case-insensitively.
    pub async fn get_by_email(&self, email: &str) -> DbResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email.trim().to_lowercase())
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Applies a partial edit. A new password is hashed like on signup.
    ///
    /// ## Errors
    /// - `Validation` for a malformed email, blank name, short password or bad DNI
    /// - `NotFound` if the user does not exist
    /// - `UniqueViolation` if the new email is taken
    /// - `ForeignKeyViolation` if the new company does not exist
    pub async fn update(&self, id: i64, update: &UserUpdate) -> DbResult<User> {
        validate_user_update(update).map_err(CoreError::from)?;

        let email = update.email.as_deref().map(|e| e.trim().to_lowercase());
        let hashed = update.password.as_deref().map(hash_password).transpose()?;

        let result = sqlx::query(
            r#"
            UPDATE users SET
                email = COALESCE(?2, email),
                full_name = COALESCE(?3, full_name),
                hashed_password = COALESCE(?4, hashed_password),
                role = COALESCE(?5, role),
                id_empresa = COALESCE(?6, id_empresa),
                dni = COALESCE(?7, dni),
                cargo = COALESCE(?8, cargo),
                ceco = COALESCE(?9, ceco),
                gerencia = COALESCE(?10, gerencia),
                area = COALESCE(?11, area),
                banco = COALESCE(?12, banco),
                cuenta_bancaria = COALESCE(?13, cuenta_bancaria),
                phone = COALESCE(?14, phone),
                estado = COALESCE(?15, estado)
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&email)
        .bind(update.full_name.as_deref().map(str::trim))
        .bind(&hashed)
        .bind(update.role)
        .bind(update.id_empresa)
        .bind(&update.dni)
        .bind(&update.cargo)
        .bind(&update.ceco)
        .bind(&update.gerencia)
        .bind(&update.area)
        .bind(&update.banco)
        .bind(&update.cuenta_bancaria)
        .bind(&update.phone)
        .bind(update.estado)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => {
                DbError::duplicate("email", email.clone().unwrap_or_default())
            }
            other => other,
        })?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        info!(user_id = id, password_changed = hashed.is_some(), "User updated");
        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("User", id))
    }

    /// Users of a company with at least one PENDIENTE document, each with
    /// those documents. Read in one transaction.
    pub async fn with_pending_documents(
        &self,
        company_id: i64,
    ) -> DbResult<Vec<UserWithPendingDocuments>> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users u \
             WHERE u.id_empresa = ?1 AND EXISTS ( \
                 SELECT 1 FROM documentos d \
                 WHERE d.id_user = u.id AND d.id_empresa = ?1 AND d.estado = ?2) \
             ORDER BY u.full_name, u.id"
        );
        let users = sqlx::query_as::<_, User>(&sql)
            .bind(company_id)
            .bind(DocumentStatus::Pendiente)
            .fetch_all(&mut *tx)
            .await?;

        let docs_sql = format!(
            "{DOCUMENT_SELECT} WHERE d.id_user = ?1 AND d.id_empresa = ?2 AND d.estado = ?3 \
             ORDER BY d.id"
        );
        let mut items = Vec::with_capacity(users.len());
        for user in users {
            let documentos = sqlx::query_as::<_, Documento>(&docs_sql)
                .bind(user.id)
                .bind(company_id)
                .bind(DocumentStatus::Pendiente)
                .fetch_all(&mut *tx)
                .await?;
            items.push(UserWithPendingDocuments { user, documentos });
        }

        tx.commit().await?;

        debug!(company_id, count = items.len(), "Listed users with pending documents");
        Ok(items)
    }

    /// Whether a user with this id exists.
    pub async fn exists(&self, id: i64) -> DbResult<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    /// Lists users of a company, optionally narrowed to one role.
    ///
    /// Used to fill approver / accountant pickers.
    pub async fn list(&self, company_id: i64, role: Option<UserRole>) -> DbResult<Vec<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE id_empresa = ?1 AND (?2 IS NULL OR role = ?2) AND estado = 1 \
             ORDER BY full_name"
        );
        let users = sqlx::query_as::<_, User>(&sql)
            .bind(company_id)
            .bind(role)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    /// Checks an email/password pair.
    ///
    /// ## Returns
    /// * `Ok(Some(user))` - credentials match an active user
    /// * `Ok(None)` - unknown email, wrong password or inactive user
    pub async fn verify_credentials(&self, email: &str, password: &str) -> DbResult<Option<User>> {
        let email = email.trim().to_lowercase();

        let row: Option<(i64, String, bool)> =
            sqlx::query_as("SELECT id, hashed_password, estado FROM users WHERE email = ?1")
                .bind(&email)
                .fetch_optional(&self.pool)
                .await?;

        let Some((id, hashed, active)) = row else {
            return Ok(None);
        };

        if !active || !verify_password(password, &hashed)? {
            debug!(email = %email, "Credential check failed");
            return Ok(None);
        }

        self.get(id).await
    }
}

fn hash_password(password: &str) -> DbResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| DbError::Internal(format!("password hashing failed: {e}")))
}

fn verify_password(password: &str, hashed: &str) -> DbResult<bool> {
    let parsed = PasswordHash::new(hashed)
        .map_err(|e| DbError::Internal(format!("stored password hash is invalid: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{memory_db, user};
    use arendir_core::{ErrorKind, Money, NewDocumento, SequenceKind};

    #[tokio::test]
    async fn test_create_and_verify() {
        let db = memory_db().await;
        let created = user(&db, "Ana@Empresa.pe").await;

        assert_eq!(created.email, "ana@empresa.pe");
        assert_eq!(created.role, UserRole::Colaborador);
        assert_eq!(created.id_empresa, DEFAULT_COMPANY_ID);
        assert!(created.estado);

        let ok = db
            .users()
            .verify_credentials("ana@empresa.pe", "s3cret-pass")
            .await
            .unwrap();
        assert_eq!(ok.map(|u| u.id), Some(created.id));

        let bad = db
            .users()
            .verify_credentials("ana@empresa.pe", "wrong-pass")
            .await
            .unwrap();
        assert!(bad.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let db = memory_db().await;
        user(&db, "ana@empresa.pe").await;

        let err = db
            .users()
            .create(&NewUser {
                email: "ana@empresa.pe".into(),
                full_name: "Otra Ana".into(),
                password: "another-pass".into(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_invalid_user_rejected() {
        let db = memory_db().await;
        let err = db
            .users()
            .create(&NewUser {
                email: "not-an-email".into(),
                full_name: "X".into(),
                password: "long-enough".into(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_list_by_role() {
        let db = memory_db().await;
        user(&db, "ana@empresa.pe").await;
        db.users()
            .create(&NewUser {
                email: "jefe@empresa.pe".into(),
                full_name: "Jefe Aprobador".into(),
                password: "approver-pass".into(),
                role: Some(UserRole::Aprobador),
                ..Default::default()
            })
            .await
            .unwrap();

        let all = db.users().list(DEFAULT_COMPANY_ID, None).await.unwrap();
        assert_eq!(all.len(), 2);

        let approvers = db
            .users()
            .list(DEFAULT_COMPANY_ID, Some(UserRole::Aprobador))
            .await
            .unwrap();
        assert_eq!(approvers.len(), 1);
        assert_eq!(approvers[0].email, "jefe@empresa.pe");
    }

    #[tokio::test]
    async fn test_update_is_partial_and_rehashes() {
        let db = memory_db().await;
        let ana = user(&db, "ana@empresa.pe").await;

        let updated = db
            .users()
            .update(
                ana.id,
                &UserUpdate {
                    email: Some(" Ana.Quispe@Empresa.pe ".into()),
                    password: Some("nueva-clave-123".into()),
                    role: Some(UserRole::Aprobador),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.email, "ana.quispe@empresa.pe");
        assert_eq!(updated.role, UserRole::Aprobador);
        // Untouched fields survive
        assert_eq!(updated.full_name, ana.full_name);
        assert_eq!(updated.dni, ana.dni);

        let users = db.users();
        assert!(users
            .verify_credentials("ana.quispe@empresa.pe", "s3cret-pass")
            .await
            .unwrap()
            .is_none());
        assert!(users
            .verify_credentials("ana.quispe@empresa.pe", "nueva-clave-123")
            .await
            .unwrap()
            .is_some());

        let deactivate = UserUpdate {
            estado: Some(false),
            ..Default::default()
        };
        let deactivated = users.update(ana.id, &deactivate).await.unwrap();
        assert!(!deactivated.estado);
    }

    #[tokio::test]
    async fn test_update_errors() {
        let db = memory_db().await;
        let ana = user(&db, "ana@empresa.pe").await;
        user(&db, "luis@empresa.pe").await;
        let users = db.users();

        let taken_email = UserUpdate {
            email: Some("luis@empresa.pe".into()),
            ..Default::default()
        };
        let err = users.update(ana.id, &taken_email).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let unknown_company = UserUpdate {
            id_empresa: Some(404),
            ..Default::default()
        };
        let err = users.update(ana.id, &unknown_company).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let short_password = UserUpdate {
            password: Some("short".into()),
            ..Default::default()
        };
        let err = users.update(ana.id, &short_password).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = users.update(999, &UserUpdate::default()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_get_by_email() {
        let db = memory_db().await;
        let ana = user(&db, "ana@empresa.pe").await;

        let found = db.users().get_by_email("  ANA@empresa.pe").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(ana.id));
        assert!(db.users().get_by_email("nadie@empresa.pe").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_with_pending_documents() {
        let db = memory_db().await;
        let ana = user(&db, "ana@empresa.pe").await;
        let luis = user(&db, "luis@empresa.pe").await;

        let r = db
            .sequences()
            .next_code(ana.id, DEFAULT_COMPANY_ID, SequenceKind::Rendicion)
            .await
            .unwrap();
        let pending = db
            .documents()
            .create(&NewDocumento {
                id_user: ana.id,
                id_numero_rendicion: r.id,
                total: Some(Money::from_cents(4500)),
                ..Default::default()
            })
            .await
            .unwrap();
        let reviewed = db
            .documents()
            .create(&NewDocumento {
                id_user: ana.id,
                id_numero_rendicion: r.id,
                total: Some(Money::from_cents(900)),
                ..Default::default()
            })
            .await
            .unwrap();
        db.documents()
            .review(reviewed.id, DocumentStatus::Aprobado)
            .await
            .unwrap();

        let listed = db.users().with_pending_documents(DEFAULT_COMPANY_ID).await.unwrap();
        assert_eq!(listed.len(), 1, "luis has no documents");
        assert_eq!(listed[0].user.id, ana.id);
        assert_ne!(listed[0].user.id, luis.id);
        let ids: Vec<i64> = listed[0].documentos.iter().map(|d| d.id).collect();
        assert_eq!(ids, [pending.id]);

        assert!(db.users().with_pending_documents(404).await.unwrap().is_empty());
    }
}
