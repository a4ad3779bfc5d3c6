//! # Routes
//!
//! ```text
//! Sequences        POST /rendicion/            POST /solicitud/
//!                  GET  /rendicion/last        GET  /{rendicion,solicitud}/nombres
//!                  PUT  /rendicion/{id}        PUT  /solicitud/{id}
//! Links            POST | DELETE /rendicion_solicitud
//! Reconciliation   GET  /rendicion/{id}/reconciliation
//!                  GET  /documentos/export/{pdf,excel}
//!                  GET  /rendiciones-solicitudes/con-documentos/
//! Documents        POST | GET /documentos/     GET | PUT | DELETE /documentos/{id}
//!                  PUT  /documentos/{id}/estado
//! Directory        POST /users/    GET | PUT /users/{id}
//!                  GET  /users/{by-email,with-pending-documents,by-company-and-role}/
//!                  POST | GET /companies/     GET | PUT | DELETE /companies/{id}
//! Lookups          POST /process-qr/   GET /consulta/ruc/{ruc}   GET /consulta/tipo-cambio
//! Files            GET  /files/{name}  (exported reports)
//! ```

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::handlers::{consulta, directory, document, health, link, report, sequence};
use crate::state::AppState;

/// Builds the full application router.
pub fn build_router(state: AppState) -> Router {
    let files = ServeDir::new(state.config.storage.root.clone());

    Router::new()
        .route("/health", get(health::health))
        // Sequences
        .route("/rendicion/", post(sequence::create_rendicion))
        .route("/rendicion/last", get(sequence::last_entry))
        .route("/rendicion/nombres", get(sequence::list_rendiciones))
        .route("/rendicion/{id}", put(sequence::update_rendicion))
        .route("/rendicion/{id}/reconciliation", get(report::reconciliation))
        .route("/solicitud/", post(sequence::create_solicitud))
        .route("/solicitud/nombres", get(sequence::list_solicitudes))
        .route("/solicitud/{id}", put(sequence::update_solicitud))
        // Links
        .route("/rendicion_solicitud", post(link::link).delete(link::unlink))
        // Reports
        .route(
            "/rendiciones-solicitudes/con-documentos/",
            get(report::with_documents),
        )
        .route("/documentos/export/pdf", get(report::export_pdf))
        .route("/documentos/export/excel", get(report::export_excel))
        // Documents
        .route("/documentos/", post(document::create).get(document::list))
        .route(
            "/documentos/{id}",
            get(document::get)
                .put(document::update)
                .delete(document::delete),
        )
        .route("/documentos/{id}/estado", put(document::review))
        // Directory
        .route("/users/", post(directory::create_user))
        .route("/users/by-company-and-role/", get(directory::list_users))
        .route("/users/by-email/", get(directory::user_by_email))
        .route(
            "/users/with-pending-documents/",
            get(directory::users_with_pending_documents),
        )
        .route("/users/{id}", get(directory::get_user).put(directory::update_user))
        .route(
            "/companies/",
            post(directory::create_company).get(directory::list_companies),
        )
        .route(
            "/companies/{id}",
            get(directory::get_company)
                .put(directory::update_company)
                .delete(directory::delete_company),
        )
        // Lookups
        .route("/process-qr/", post(consulta::process_qr))
        .route("/consulta/ruc/{ruc}", get(consulta::ruc))
        .route("/consulta/tipo-cambio", get(consulta::exchange_rate))
        .nest_service("/files", files)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// =============================================================================
// Router Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use arendir_db::{Database, DbConfig};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::{json, Value};
    use std::path::PathBuf;
    use tower::ServiceExt;
    use uuid::Uuid;

    async fn test_app() -> (Router, PathBuf) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let root = std::env::temp_dir().join(format!("arendir-api-{}", Uuid::new_v4()));

        let mut config = AppConfig::default();
        config.storage.root = root.clone();
        config.storage.public_base_url = "http://localhost:8000/files".to_string();

        let state = AppState::new(db, config).unwrap();
        (build_router(state), root)
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, value)
    }

    /// Creates a company and one employee in it; returns (company_id, user_id).
    async fn seed_user(app: &Router) -> (i64, i64) {
        let (status, company) = send(
            app,
            Method::POST,
            "/companies/",
            Some(json!({ "name": "Minera Andina SAC", "ruc": "20512345678" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let company_id = company["id"].as_i64().unwrap();

        let (status, user) = send(
            app,
            Method::POST,
            "/users/",
            Some(json!({
                "email": "ana.quispe@andina.pe",
                "full_name": "Ana Quispe",
                "password": "s3cret-pass",
                "id_empresa": company_id,
                "dni": "45127890",
                "cargo": "Supervisora"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        (company_id, user["id"].as_i64().unwrap())
    }

    async fn add_document(app: &Router, body: Value) -> (StatusCode, Value) {
        send(app, Method::POST, "/documentos/", Some(body)).await
    }

    /// R00001 with gastos 120.50 + 79.50 (one 1000.00 rejected) linked to
    /// S00001 with an approved 500.00 advance.
    async fn seed_report(app: &Router, user_id: i64) -> (i64, i64) {
        let (status, s) = send(
            app,
            Method::POST,
            "/solicitud/",
            Some(json!({ "id_user": user_id })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(s["nombre"], "S00001");
        let s_id = s["id"].as_i64().unwrap();

        let (status, _) = add_document(
            app,
            json!({
                "id_user": user_id,
                "id_numero_rendicion": s_id,
                "tipo_solicitud": "ANTICIPO",
                "estado": "APROBADO",
                "motivo": "Visita a planta Arequipa",
                "total": "500.00"
            }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, r) = send(
            app,
            Method::POST,
            "/rendicion/",
            Some(json!({ "id_user": user_id })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(r["nombre"], "R00001");
        let r_id = r["id"].as_i64().unwrap();

        let (status, link) = send(
            app,
            Method::POST,
            "/rendicion_solicitud",
            Some(json!({ "rendicion_id": r_id, "solicitud_id": s_id })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(link["estado"], "ACTIVO");

        for (serie, correlativo, total, estado) in [
            ("F001", "00000123", "120.50", "APROBADO"),
            ("B002", "00004567", "79.50", "PENDIENTE"),
            ("F003", "00000999", "1000.00", "RECHAZADO"),
        ] {
            let (status, doc) = add_document(
                app,
                json!({
                    "id_user": user_id,
                    "id_numero_rendicion": r_id,
                    "tipo_solicitud": "RENDICION",
                    "estado": estado,
                    "ruc": "20100070970",
                    "serie": serie,
                    "correlativo": correlativo,
                    "fecha_emision": "2024-03-05",
                    "total": total
                }),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED, "{doc}");
            assert_eq!(doc["numero_rendicion"], "R00001");
        }

        (r_id, s_id)
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = test_app().await;
        let (status, body) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["database"], true);
        assert_eq!(body["pending_migrations"], 0);
    }

    #[tokio::test]
    async fn test_reconciliation_end_to_end() {
        let (app, _) = test_app().await;
        let (_, user_id) = seed_user(&app).await;
        let (r_id, _) = seed_report(&app, user_id).await;

        let (status, body) = send(
            &app,
            Method::GET,
            &format!("/rendicion/{r_id}/reconciliation"),
            None,
        )
        .await;

        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["total_gasto"], "200.00");
        assert_eq!(body["total_anticipo"], "500.00");
        assert_eq!(body["reembolso"], "-300.00");
        assert_eq!(body["settlement"], "employee_owes");
        assert_eq!(body["solicitudes"], json!(["S00001"]));
        assert_eq!(body["gastos"].as_array().unwrap().len(), 2);
        assert_eq!(body["header"]["full_name"], "Ana Quispe");
    }

    #[tokio::test]
    async fn test_codes_are_per_user_and_kind() {
        let (app, _) = test_app().await;
        let (_, user_id) = seed_user(&app).await;

        for expected in ["R00001", "R00002", "R00003"] {
            let (_, entry) = send(
                &app,
                Method::POST,
                "/rendicion/",
                Some(json!({ "id_user": user_id })),
            )
            .await;
            assert_eq!(entry["nombre"], expected);
        }
        let (_, s) = send(
            &app,
            Method::POST,
            "/solicitud/",
            Some(json!({ "id_user": user_id })),
        )
        .await;
        assert_eq!(s["nombre"], "S00001");

        let (status, last) = send(
            &app,
            Method::GET,
            &format!("/rendicion/last?id_user={user_id}&tipo=RENDICION"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(last["nombre"], "R00003");

        let (status, list) = send(
            &app,
            Method::GET,
            &format!("/rendicion/nombres?id_user={user_id}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_unknown_user_is_not_found() {
        let (app, _) = test_app().await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/rendicion/",
            Some(json!({ "id_user": 4242 })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_duplicate_link_conflicts() {
        let (app, _) = test_app().await;
        let (_, user_id) = seed_user(&app).await;
        let (r_id, s_id) = seed_report(&app, user_id).await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/rendicion_solicitud",
            Some(json!({ "rendicion_id": r_id, "solicitud_id": s_id })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "CONFLICT");

        let uri = format!("/rendicion_solicitud?rendicion_id={r_id}&solicitud_id={s_id}");
        let (status, body) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["removed"], true);

        // Without the link the advance no longer offsets anything
        let (_, body) = send(
            &app,
            Method::GET,
            &format!("/rendicion/{r_id}/reconciliation"),
            None,
        )
        .await;
        assert_eq!(body["total_anticipo"], "0.00");
        assert_eq!(body["reembolso"], "200.00");
        assert_eq!(body["settlement"], "employee_owed");
    }

    #[tokio::test]
    async fn test_duplicate_document_conflicts() {
        let (app, _) = test_app().await;
        let (_, user_id) = seed_user(&app).await;
        let (r_id, _) = seed_report(&app, user_id).await;

        let (status, body) = add_document(
            &app,
            json!({
                "id_user": user_id,
                "id_numero_rendicion": r_id,
                "tipo_solicitud": "RENDICION",
                "ruc": "20100070970",
                "serie": "F001",
                "correlativo": "00000123",
                "fecha_emision": "2024-03-05",
                "total": "120.50"
            }),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT, "{body}");
    }

    #[tokio::test]
    async fn test_export_excel_stores_file() {
        let (app, root) = test_app().await;
        let (_, user_id) = seed_user(&app).await;
        let (r_id, _) = seed_report(&app, user_id).await;

        let (status, body) = send(
            &app,
            Method::GET,
            &format!("/documentos/export/excel?id_rendicion={r_id}&id_usuario={user_id}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["nombre"], "R00001");
        assert_eq!(body["reembolso"], "-300.00");

        let url = body["url"].as_str().unwrap();
        assert!(url.starts_with("http://localhost:8000/files/rendicion_R00001_"));
        let name = url.rsplit('/').next().unwrap();
        let stored = tokio::fs::read_to_string(root.join(name)).await.unwrap();
        assert!(stored.contains("Ana Quispe"));
        assert!(stored.contains("F001"));

        // Served back under /files
        let (status, served) = send(&app, Method::GET, &format!("/files/{name}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(served.as_str().unwrap().contains("R00001"));

        let _ = tokio::fs::remove_dir_all(&root).await;
    }

    #[tokio::test]
    async fn test_export_pdf_without_renderer_is_unavailable() {
        let (app, _) = test_app().await;
        let (_, user_id) = seed_user(&app).await;
        let (r_id, _) = seed_report(&app, user_id).await;

        let (status, body) = send(
            &app,
            Method::GET,
            &format!("/documentos/export/pdf?id_rendicion={r_id}&id_usuario={user_id}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], "UPSTREAM_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_export_for_another_user_is_rejected() {
        let (app, _) = test_app().await;
        let (_, user_id) = seed_user(&app).await;
        let (r_id, _) = seed_report(&app, user_id).await;

        let other = user_id + 100;
        let (status, body) = send(
            &app,
            Method::GET,
            &format!("/documentos/export/excel?id_rendicion={r_id}&id_usuario={other}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_lifecycle_and_with_documents() {
        let (app, _) = test_app().await;
        let (_, user_id) = seed_user(&app).await;
        let (r_id, _) = seed_report(&app, user_id).await;

        // NUEVO entries are drafts and stay out of the review listing
        let (status, body) = send(
            &app,
            Method::GET,
            "/rendiciones-solicitudes/con-documentos/",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.as_array().unwrap().is_empty());

        let (status, entry) = send(
            &app,
            Method::PUT,
            &format!("/rendicion/{r_id}"),
            Some(json!({ "estado": "PENDIENTE" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{entry}");
        assert_eq!(entry["estado"], "PENDIENTE");

        // Skipping approval is refused
        let (status, _) = send(
            &app,
            Method::PUT,
            &format!("/rendicion/{r_id}"),
            Some(json!({ "estado": "ABONADO" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &app,
            Method::GET,
            &format!("/rendiciones-solicitudes/con-documentos/?id_user={user_id}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let entries = body.as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["nombre"], "R00001");
        assert_eq!(entries[0]["full_name"], "Ana Quispe");
        assert_eq!(entries[0]["total"], "200.00");
        assert_eq!(entries[0]["documentos"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_document_review_and_delete() {
        let (app, _) = test_app().await;
        let (_, user_id) = seed_user(&app).await;
        let (r_id, _) = seed_report(&app, user_id).await;

        let (_, docs) = send(
            &app,
            Method::GET,
            &format!("/documentos/?id_numero_rendicion={r_id}"),
            None,
        )
        .await;
        let docs = docs.as_array().unwrap();
        assert_eq!(docs.len(), 3);
        let pending = docs.iter().find(|d| d["estado"] == "PENDIENTE").unwrap();
        let pending_id = pending["id"].as_i64().unwrap();

        let (status, reviewed) = send(
            &app,
            Method::PUT,
            &format!("/documentos/{pending_id}/estado"),
            Some(json!({ "estado": "RECHAZADO" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(reviewed["estado"], "RECHAZADO");

        let (_, body) = send(
            &app,
            Method::GET,
            &format!("/rendicion/{r_id}/reconciliation"),
            None,
        )
        .await;
        assert_eq!(body["total_gasto"], "120.50");
        assert_eq!(body["reembolso"], "-379.50");

        let (status, _) = send(
            &app,
            Method::DELETE,
            &format!("/documentos/{pending_id}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, Method::GET, &format!("/documentos/{pending_id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_directory_listing() {
        let (app, _) = test_app().await;
        let (company_id, user_id) = seed_user(&app).await;

        let (status, users) = send(
            &app,
            Method::GET,
            &format!("/users/by-company-and-role/?id_empresa={company_id}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(users[0]["id"].as_i64(), Some(user_id));
        assert!(users[0].get("password").is_none());

        let (status, companies) = send(&app, Method::GET, "/companies/", None).await;
        assert_eq!(status, StatusCode::OK);
        // Default company plus the seeded one
        assert_eq!(companies.as_array().unwrap().len(), 2);

        let (status, _) = send(&app, Method::GET, "/companies/9999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_lookups() {
        let (app, _) = test_app().await;

        let qr = "20123456789|01|F001-0004567|18.00|118.00|2024-03-05|6|45127890|";
        let (status, fields) = send(
            &app,
            Method::POST,
            "/process-qr/",
            Some(json!({ "data": qr })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fields["ruc"], "20123456789");
        assert_eq!(fields["serie"], "F001");
        assert_eq!(fields["total"], "118.00");

        let (status, body) = send(&app, Method::GET, "/consulta/ruc/20123456789", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], "UPSTREAM_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_allocation_for_foreign_company_is_rejected() {
        let (app, _) = test_app().await;
        let (company_id, user_id) = seed_user(&app).await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/rendicion/",
            Some(json!({ "id_user": user_id, "id_empresa": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(body["code"], "VALIDATION_ERROR");

        // Nothing was allocated, so the owner's own company still starts at 1
        let (status, entry) = send(
            &app,
            Method::POST,
            "/rendicion/",
            Some(json!({ "id_user": user_id, "id_empresa": company_id })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(entry["nombre"], "R00001");
        assert_eq!(entry["id_empresa"].as_i64(), Some(company_id));
    }

    #[tokio::test]
    async fn test_document_update() {
        let (app, _) = test_app().await;
        let (_, user_id) = seed_user(&app).await;
        let (r_id, _) = seed_report(&app, user_id).await;

        let (_, docs) = send(
            &app,
            Method::GET,
            &format!("/documentos/?id_numero_rendicion={r_id}"),
            None,
        )
        .await;
        let pending = docs
            .as_array()
            .unwrap()
            .iter()
            .find(|d| d["estado"] == "PENDIENTE")
            .unwrap()
            .clone();
        let id = pending["id"].as_i64().unwrap();

        let mut edit = json!({
            "id_user": user_id,
            "id_numero_rendicion": r_id,
            "tipo_solicitud": "RENDICION",
            "ruc": "20100070970",
            "serie": "B002",
            "correlativo": "00004567",
            "fecha_emision": "2024-03-05",
            "proveedor": "Restaurante El Tambo",
            "total": "89.50"
        });
        let (status, updated) = send(
            &app,
            Method::PUT,
            &format!("/documentos/{id}"),
            Some(edit.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{updated}");
        assert_eq!(updated["total"], "89.50");
        assert_eq!(updated["proveedor"], "Restaurante El Tambo");
        assert_eq!(updated["estado"], "PENDIENTE");

        let (_, body) = send(
            &app,
            Method::GET,
            &format!("/rendicion/{r_id}/reconciliation"),
            None,
        )
        .await;
        assert_eq!(body["total_gasto"], "210.00");

        // Taking over the identity of the approved F001 line is a duplicate
        edit["serie"] = json!("F001");
        edit["correlativo"] = json!("00000123");
        edit["total"] = json!("120.50");
        let (status, _) = send(
            &app,
            Method::PUT,
            &format!("/documentos/{id}"),
            Some(edit.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        edit["ruc"] = json!("1234");
        let (status, _) = send(
            &app,
            Method::PUT,
            &format!("/documentos/{id}"),
            Some(edit.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, Method::PUT, "/documentos/9999", Some(edit)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "validation runs before the lookup");
    }

    #[tokio::test]
    async fn test_user_update_and_lookups() {
        let (app, _) = test_app().await;
        let (company_id, user_id) = seed_user(&app).await;
        let (r_id, _) = seed_report(&app, user_id).await;

        let (status, user) = send(
            &app,
            Method::PUT,
            &format!("/users/{user_id}"),
            Some(json!({ "cargo": "Jefa de Planta", "role": "APROBADOR" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{user}");
        assert_eq!(user["cargo"], "Jefa de Planta");
        assert_eq!(user["role"], "APROBADOR");
        assert_eq!(user["full_name"], "Ana Quispe");

        let (status, _) = send(
            &app,
            Method::PUT,
            "/users/9999",
            Some(json!({ "cargo": "X" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, found) = send(
            &app,
            Method::GET,
            "/users/by-email/?email=ANA.QUISPE@andina.pe",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(found["id"].as_i64(), Some(user_id));
        let (status, _) = send(
            &app,
            Method::GET,
            "/users/by-email/?email=nadie@andina.pe",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, pending) = send(
            &app,
            Method::GET,
            &format!("/users/with-pending-documents/?id_empresa={company_id}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{pending}");
        let pending = pending.as_array().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0]["email"], "ana.quispe@andina.pe");
        let docs = pending[0]["documentos"].as_array().unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["serie"], "B002");
        assert_eq!(docs[0]["id_numero_rendicion"].as_i64(), Some(r_id));
    }

    #[tokio::test]
    async fn test_company_update_and_delete() {
        let (app, _) = test_app().await;
        let (company_id, _) = seed_user(&app).await;

        let (status, company) = send(
            &app,
            Method::PUT,
            &format!("/companies/{company_id}"),
            Some(json!({ "name": "Minera Andina del Sur SAC", "ruc": "20512345678" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{company}");
        assert_eq!(company["name"], "Minera Andina del Sur SAC");

        // Still has an employee
        let (status, body) = send(
            &app,
            Method::DELETE,
            &format!("/companies/{company_id}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT, "{body}");

        let (_, empty) = send(
            &app,
            Method::POST,
            "/companies/",
            Some(json!({ "name": "Vacia SAC" })),
        )
        .await;
        let empty_id = empty["id"].as_i64().unwrap();
        let (status, _) = send(&app, Method::DELETE, &format!("/companies/{empty_id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, Method::GET, &format!("/companies/{empty_id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
