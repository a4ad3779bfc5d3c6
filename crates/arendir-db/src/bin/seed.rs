//! # Seed Data Generator
//!
//! Populates a database with a demo company, its staff, and one advance plus
//! one expense report per collaborator, linked and ready to reconcile.
//!
//! ## Usage
//! ```bash
//! # 3 collaborators (default)
//! cargo run -p arendir-db --bin seed
//!
//! # Custom amount and path
//! cargo run -p arendir-db --bin seed -- --users 10 --db ./data/arendir.db
//! ```

use chrono::{Duration, Utc};
use std::env;

use arendir_core::{
    AdvancePolicy, DocumentStatus, EntryPatch, EntryStatus, Money, NewCompany, NewDocumento,
    NewUser, SequenceKind, TipoSolicitud, UserRole,
};
use arendir_db::{Database, DbConfig};

/// Expense lines filed on every demo report: (tipo_gasto, proveedor ruc, serie, cents).
const EXPENSES: &[(&str, &str, &str, i64)] = &[
    ("MOVILIDAD", "20100047218", "F001", 4550),
    ("ALIMENTACION", "20331061655", "B204", 12050),
    ("HOSPEDAJE", "20504743307", "F105", 32000),
];

const FIRST_NAMES: &[&str] = &["Ana", "Luis", "Rosa", "Jorge", "Carmen", "Pedro", "Lucia", "Raul"];
const LAST_NAMES: &[&str] = &["Quispe", "Mamani", "Flores", "Huaman", "Rojas", "Vargas"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut users: usize = 3;
    let mut db_path = String::from("./arendir_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--users" | "-u" => {
                if i + 1 < args.len() {
                    users = args[i + 1].parse().unwrap_or(3);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Arendir Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -u, --users <N>    Collaborators to create (default: 3)");
                println!("  -d, --db <PATH>    Database file path (default: ./arendir_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Arendir Seed Data Generator");
    println!("==============================");
    println!("Database:      {}", db_path);
    println!("Collaborators: {}", users);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    if db.companies().list().await?.len() > 1 {
        println!("⚠ Database already has demo companies");
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let company = db
        .companies()
        .create(&NewCompany {
            name: "Minera Andina SAC".into(),
            ruc: Some("20512345678".into()),
            description: Some("Demo tenant".into()),
            logo: None,
        })
        .await?;
    println!("✓ Company {} ({})", company.name, company.id);

    let approver = db
        .users()
        .create(&NewUser {
            email: "aprobador@andina.pe".into(),
            full_name: "Marco Aprobador".into(),
            password: "demo-password".into(),
            role: Some(UserRole::Aprobador),
            id_empresa: Some(company.id),
            ..Default::default()
        })
        .await?;
    db.users()
        .create(&NewUser {
            email: "contador@andina.pe".into(),
            full_name: "Elena Contadora".into(),
            password: "demo-password".into(),
            role: Some(UserRole::Contador),
            id_empresa: Some(company.id),
            ..Default::default()
        })
        .await?;

    println!();
    println!("Generating collaborators...");

    let today = Utc::now().date_naive();

    for n in 0..users {
        let full_name = format!(
            "{} {}",
            FIRST_NAMES[n % FIRST_NAMES.len()],
            LAST_NAMES[(n * 7) % LAST_NAMES.len()]
        );
        let user = db
            .users()
            .create(&NewUser {
                email: format!("colaborador{}@andina.pe", n + 1),
                full_name: full_name.clone(),
                password: "demo-password".into(),
                id_empresa: Some(company.id),
                dni: Some(format!("{:08}", 40_000_000 + n * 1_337)),
                cargo: Some("Supervisor de campo".into()),
                ceco: Some(format!("CC-{:03}", 100 + n)),
                gerencia: Some("Operaciones".into()),
                ..Default::default()
            })
            .await?;

        // Advance first, then the report it funds
        let solicitud = db
            .sequences()
            .next_code(user.id, company.id, SequenceKind::Anticipo)
            .await?;
        db.documents()
            .create(&NewDocumento {
                id_user: user.id,
                id_numero_rendicion: solicitud.id,
                tipo_solicitud: Some(TipoSolicitud::Anticipo),
                estado: Some(DocumentStatus::Aprobado),
                fecha_solicitud: Some(today - Duration::days(10)),
                motivo: Some("Viaje a faena".into()),
                total: Some(Money::from_cents(50_000)),
                ..Default::default()
            })
            .await?;

        let rendicion = db
            .sequences()
            .next_code(user.id, company.id, SequenceKind::Rendicion)
            .await?;
        db.links().link(rendicion.id, solicitud.id, "ACTIVO").await?;

        for (idx, (tipo_gasto, ruc, serie, cents)) in EXPENSES.iter().enumerate() {
            db.documents()
                .create(&NewDocumento {
                    id_user: user.id,
                    id_numero_rendicion: rendicion.id,
                    tipo_solicitud: Some(TipoSolicitud::Rendicion),
                    fecha_emision: Some(today - Duration::days(5 - idx as i64)),
                    ruc: Some((*ruc).to_string()),
                    serie: Some((*serie).to_string()),
                    correlativo: Some(format!("{:08}", 1000 + n * 10 + idx)),
                    tipo_documento: Some("Factura".into()),
                    tipo_gasto: Some((*tipo_gasto).to_string()),
                    total: Some(Money::from_cents(*cents + (n as i64) * 100)),
                    ..Default::default()
                })
                .await?;
        }

        for id in [solicitud.id, rendicion.id] {
            db.sequences()
                .update_entry(
                    id,
                    &EntryPatch {
                        estado: Some(EntryStatus::Pendiente),
                        id_aprobador: Some(approver.id),
                        nom_aprobador: Some(approver.full_name.clone()),
                        ..Default::default()
                    },
                )
                .await?;
        }

        let result = db
            .reports()
            .reconcile(rendicion.id, AdvancePolicy::ApprovedOnly)
            .await?;
        println!(
            "  {:<16} {} ↔ {}  gasto {:>8}  anticipo {:>8}  reembolso {:>8}",
            full_name,
            rendicion.nombre,
            solicitud.nombre,
            result.totals.total_gasto,
            result.totals.total_anticipo,
            result.totals.reembolso
        );
    }

    db.close().await;

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
