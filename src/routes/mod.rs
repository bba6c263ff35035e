use actix_web::{web, HttpResponse, Responder};
use serde_json::json;

use crate::models::AppState;

/// HTTP handler for the index page
pub async fn index() -> impl Responder {
    HttpResponse::Ok().body("Turn arbiter chess host")
}

pub async fn health(app_state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "connections_opened": app_state.connections_opened(),
    }))
}

/// Configure the HTTP routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/ws").route(web::get().to(crate::websocket::ws_index)))
        .service(web::resource("/").route(web::get().to(index)))
        .service(web::resource("/health").route(web::get().to(health)));
}
