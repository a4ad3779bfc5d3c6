//! # arendir-db: Database Layer for Arendir
//!
//! SQLite persistence for users, companies, rendiciones/solicitudes, their
//! links and their documents, using sqlx for async access.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Arendir Data Flow                               │
//! │                                                                         │
//! │  HTTP handler (POST /rendicion/)                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   arendir-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                │    │  (embedded)  │  │   │
//! │  │   │               │    │ SequenceRepo   │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ LinkRepo       │    │ 001_initial  │  │   │
//! │  │   │ WAL + busy    │    │ DocumentRepo   │    │ _schema.sql  │  │   │
//! │  │   │ timeout       │    │ ReportRepo ... │    │              │  │   │
//! │  │   └───────────────┘    └────────────────┘    └──────────────┘  │   │
//! │  │                               │                                 │   │
//! │  │                               ▼                                 │   │
//! │  │                  arendir-core (codes, netting, validation)      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use arendir_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("arendir.db")).await?;
//! let entry = db.sequences().next_code(user_id, company_id, SequenceKind::Rendicion).await?;
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::company::CompanyRepository;
pub use repository::document::DocumentRepository;
pub use repository::link::LinkRepository;
pub use repository::report::{EntryWithDocuments, ReportRepository, WithDocumentsFilter};
pub use repository::sequence::{SequenceRepository, MAX_ALLOCATION_ATTEMPTS};
pub use repository::user::{UserRepository, UserWithPendingDocuments};
