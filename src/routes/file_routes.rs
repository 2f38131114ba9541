// mimir-service/src/routes/file_routes.rs
//
// Raw object retrieval. These routes are the serving side of the two URL
// flavours the object store hands out: public URLs for resources shared
// with the world, signed URLs for everything else.
use crate::models::ServiceError;
use crate::services::AppState;
use crate::store::{ObjectStore, RecordStore};
use actix_web::{get, web, HttpResponse, Responder};
use log::info;
use serde::Deserialize;

// GET ROUTES
#[get("/")]
async fn index() -> impl Responder {
    HttpResponse::Ok().body("Welcome to Mimir! Authenticate via /auth/login to manage teams, projects and scoped resources.")
}

#[derive(Deserialize)]
struct SignedQuery {
    token: String,
}

fn content_type_for(path: &str) -> &'static str {
    match path.rsplit('.').next() {
        Some("pdf") => "application/pdf",
        Some("md") | Some("markdown") => "text/markdown",
        Some("txt") => "text/plain",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

// Serve an object through a signed URL. The token is the entire grant: it
// names the path and its expiry, and was only ever issued after a read
// authorization passed.
#[get("/files/signed")]
async fn get_signed_file(
    state: web::Data<AppState>,
    query: web::Query<SignedQuery>,
) -> Result<HttpResponse, ServiceError> {
    let path = state.signer.verify(&query.token)?;

    info!("📥 Serving signed object: {}", path);

    let bytes = state.objects.get(&path)?;

    Ok(HttpResponse::Ok()
        .content_type(content_type_for(&path))
        .body(bytes))
}

// Serve a public object directly by path. Only objects whose record is
// marked public are reachable here; everything else needs a signed URL.
#[get("/files/public/{path:.*}")]
async fn get_public_file(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let storage_path = path.into_inner();

    let resource = state
        .records
        .find_resource_by_path(&storage_path)?
        .ok_or(ServiceError::NotFound)?;

    if !resource.is_public {
        return Err(ServiceError::NotFound);
    }

    info!("📥 Serving public object: {}", storage_path);

    let bytes = state.objects.get(&storage_path)?;

    Ok(HttpResponse::Ok()
        .content_type(content_type_for(&storage_path))
        .body(bytes))
}

// Register routes function for easy import
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(index)
        .service(get_signed_file)
        .service(get_public_file);
}
