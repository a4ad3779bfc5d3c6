//! # Repository Module
//!
//! One repository per aggregate. Each holds a pool clone and owns its SQL.
//!
//! ```text
//! db.sequences().next_code(..)      db.reports().reconcile(..)
//!        │                                 │
//!        ▼                                 ▼
//!  SequenceRepository               ReportRepository
//!  ├── next_code                    ├── reconcile (one read snapshot)
//!  ├── last_entry / list_entries    └── list_with_documents
//!  └── update_entry
//!        │                                 │
//!        └──────────────┬──────────────────┘
//!                       ▼
//!                SQLite (runtime-checked queries)
//! ```
//!
//! ## Available Repositories
//!
//! - [`user::UserRepository`] - users and password hashes
//! - [`company::CompanyRepository`] - tenants
//! - [`sequence::SequenceRepository`] - R/S code allocation and entry lifecycle
//! - [`link::LinkRepository`] - rendicion ↔ solicitud links
//! - [`document::DocumentRepository`] - expense and advance documents
//! - [`report::ReportRepository`] - reconciliation and dashboards

pub mod company;
pub mod document;
pub mod link;
pub mod report;
pub mod sequence;
pub mod user;

/// Column list shared by every `SequenceEntry` query.
pub(crate) const ENTRY_COLUMNS: &str = "id, id_user, id_empresa, nombre, kind, estado, \
     fecha_registro, fecha_actualizacion, id_aprobador, nom_aprobador, id_contador, nom_contador";

#[cfg(test)]
pub(crate) mod test_support {
    //! Fixtures shared by the repository tests.

    use arendir_core::{NewUser, User, DEFAULT_COMPANY_ID};

    use crate::{Database, DbConfig};

    pub async fn memory_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    pub async fn user(db: &Database, email: &str) -> User {
        db.users()
            .create(&NewUser {
                email: email.to_string(),
                full_name: "Ana Quispe".to_string(),
                password: "s3cret-pass".to_string(),
                id_empresa: Some(DEFAULT_COMPANY_ID),
                dni: Some("45127890".to_string()),
                cargo: Some("Analista".to_string()),
                ceco: Some("CC-100".to_string()),
                gerencia: Some("Finanzas".to_string()),
                ..Default::default()
            })
            .await
            .unwrap()
    }
}
