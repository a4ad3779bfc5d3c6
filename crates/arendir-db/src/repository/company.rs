//! # Company Repository
//!
//! Tenants. Every user, entry and document carries an `id_empresa`.

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use arendir_core::validation::validate_ruc;
use arendir_core::{Company, CoreError, NewCompany, ValidationError, DEFAULT_COMPANY_ID};

/// Repository for company database operations.
#[derive(Debug, Clone)]
pub struct CompanyRepository {
    pool: SqlitePool,
}

impl CompanyRepository {
    /// Creates a new CompanyRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CompanyRepository { pool }
    }

    /// Creates a company. Names are unique.
    pub async fn create(&self, company: &NewCompany) -> DbResult<Company> {
        let name = check_company(company)?;

        debug!(name = %name, "Creating company");

        let result = sqlx::query(
            "INSERT INTO companies (name, ruc, description, logo) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(name)
        .bind(&company.ruc)
        .bind(&company.description)
        .bind(&company.logo)
        .execute(&self.pool)
        .await
        .map_err(|e| name_taken(e, name))?;

        let id = result.last_insert_rowid();
        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Company", id))
    }

    /// Replaces a company's fields.
    ///
    /// ## Errors
    /// - `Validation` for a blank name or bad RUC
    /// - `NotFound` if the company does not exist
    /// - `UniqueViolation` if another company has the name
    pub async fn update(&self, id: i64, company: &NewCompany) -> DbResult<Company> {
        let name = check_company(company)?;

        let result = sqlx::query(
            "UPDATE companies SET name = ?2, ruc = ?3, description = ?4, logo = ?5 WHERE id = ?1",
        )
        .bind(id)
        .bind(name)
        .bind(&company.ruc)
        .bind(&company.description)
        .bind(&company.logo)
        .execute(&self.pool)
        .await
        .map_err(|e| name_taken(e, name))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Company", id));
        }

        info!(company_id = id, name = %name, "Company updated");
        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Company", id))
    }

    /// Deletes a company nobody references.
    ///
    /// ## Errors
    /// - `Validation` for the default company
    /// - `NotFound` if the company does not exist
    /// - `Conflict` while users, entries or documents still point at it
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        if id == DEFAULT_COMPANY_ID {
            return Err(CoreError::from(ValidationError::format(
                "id",
                "the default company cannot be deleted",
            ))
            .into());
        }

        let result = sqlx::query("DELETE FROM companies WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::ForeignKeyViolation { .. } => {
                    DbError::Conflict(format!("company {id} still has users or records"))
                }
                other => other,
            })?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Company", id));
        }

        info!(company_id = id, "Company deleted");
        Ok(())
    }

    /// Gets a company by id.
    pub async fn get(&self, id: i64) -> DbResult<Option<Company>> {
        let company = sqlx::query_as::<_, Company>(
            "SELECT id, name, ruc, description, logo FROM companies WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(company)
    }

    /// Lists all companies by name.
    pub async fn list(&self) -> DbResult<Vec<Company>> {
        let companies = sqlx::query_as::<_, Company>(
            "SELECT id, name, ruc, description, logo FROM companies ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(companies)
    }
}

/// Trimmed name of a valid company input.
fn check_company(company: &NewCompany) -> DbResult<&str> {
    let name = company.name.trim();
    if name.is_empty() {
        return Err(CoreError::from(ValidationError::Required {
            field: "name".to_string(),
        })
        .into());
    }
    if let Some(ruc) = company.ruc.as_deref().filter(|r| !r.trim().is_empty()) {
        validate_ruc(ruc).map_err(CoreError::from)?;
    }
    Ok(name)
}

fn name_taken(err: sqlx::Error, name: &str) -> DbError {
    match DbError::from(err) {
        DbError::UniqueViolation { .. } => DbError::duplicate("name", name),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::memory_db;
    use arendir_core::ErrorKind;

    #[tokio::test]
    async fn test_create_get_list() {
        let db = memory_db().await;
        let created = db
            .companies()
            .create(&NewCompany {
                name: "Minera Andina SAC".into(),
                ruc: Some("20123456789".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        let fetched = db.companies().get(created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);

        // Default company plus the new one
        assert_eq!(db.companies().list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_name_and_bad_ruc() {
        let db = memory_db().await;
        let new = NewCompany {
            name: "Minera Andina SAC".into(),
            ..Default::default()
        };
        db.companies().create(&new).await.unwrap();

        let err = db.companies().create(&new).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let err = db
            .companies()
            .create(&NewCompany {
                name: "Otra".into(),
                ruc: Some("123".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_update_company() {
        let db = memory_db().await;
        let companies = db.companies();
        let minera = companies
            .create(&NewCompany {
                name: "Minera Andina SAC".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        let renamed = companies
            .update(
                minera.id,
                &NewCompany {
                    name: " Minera Andina del Sur SAC ".into(),
                    ruc: Some("20123456789".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.name, "Minera Andina del Sur SAC");
        assert_eq!(renamed.ruc.as_deref(), Some("20123456789"));

        let err = companies
            .update(
                minera.id,
                &NewCompany {
                    name: "Empresa por defecto".into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let ghost = NewCompany {
            name: "X".into(),
            ..Default::default()
        };
        let err = companies.update(404, &ghost).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_delete_company() {
        let db = memory_db().await;
        let companies = db.companies();
        let empty = companies
            .create(&NewCompany {
                name: "Vacia SAC".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        let staffed = companies
            .create(&NewCompany {
                name: "Con Personal SAC".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        db.users()
            .create(&arendir_core::NewUser {
                email: "eva@conpersonal.pe".into(),
                full_name: "Eva Torres".into(),
                password: "eva-password".into(),
                id_empresa: Some(staffed.id),
                ..Default::default()
            })
            .await
            .unwrap();

        companies.delete(empty.id).await.unwrap();
        assert!(companies.get(empty.id).await.unwrap().is_none());
        assert_eq!(companies.delete(empty.id).await.unwrap_err().kind(), ErrorKind::NotFound);

        let err = companies.delete(staffed.id).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)));
        assert!(companies.get(staffed.id).await.unwrap().is_some());

        let err = companies.delete(DEFAULT_COMPANY_ID).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
