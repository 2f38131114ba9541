// Third-party dependencies
use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use log::info;
use std::env;
use std::sync::Arc;

use mimir_service::routes::{
    auth_routes, file_routes, project_routes, resource_routes, team_routes,
};
use mimir_service::services::AppState;
use mimir_service::store::{FsObjectStore, FsRecordStore, UrlSigner};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let address = env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:9090".to_string());
    let data_root = env::var("DATA_ROOT").unwrap_or_else(|_| "./data".to_string());
    let storage_root = env::var("STORAGE_ROOT").unwrap_or_else(|_| "./storage".to_string());
    let base_url =
        env::var("PUBLIC_BASE_URL").unwrap_or_else(|_| format!("http://{}", address));
    let url_secret =
        env::var("SIGNED_URL_SECRET").unwrap_or_else(|_| "mimir_signed_url_secret".to_string());

    std::fs::create_dir_all(&data_root)?;
    std::fs::create_dir_all(&storage_root)?;

    // Construct the capability handles once; handlers receive them injected
    let signer = UrlSigner::new(url_secret);
    let state = web::Data::new(AppState {
        records: Arc::new(FsRecordStore::new(&data_root)),
        objects: Arc::new(FsObjectStore::new(&storage_root, base_url, signer.clone())),
        signer,
    });

    info!("Server started at {}", address);

    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .app_data(state.clone())
            .configure(auth_routes::init_routes)
            .configure(team_routes::init_routes)
            .configure(project_routes::init_routes)
            .configure(resource_routes::init_routes)
            .configure(file_routes::init_routes)
    })
        .bind(address)?
        .run()
        .await
}
