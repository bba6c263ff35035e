use actix::prelude::*;
use actix_web::{web, App, HttpServer};
use log::info;

use turn_arbiter_chess::config;
use turn_arbiter_chess::game::ChessEngine;
use turn_arbiter_chess::host::Host;
use turn_arbiter_chess::models::AppState;
use turn_arbiter_chess::persistence::{JsonDirGameStore, MemoryGameStore, PersistenceActor};
use turn_arbiter_chess::routes::configure_routes;
use turn_arbiter_chess::websocket::HostActor;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let matches = config::command().get_matches();
    let config = config::from_matches(&matches)?;

    env_logger::init_from_env(env_logger::Env::new().default_filter_or(config.log_filter.as_str()));

    let storage = match &config.storage_dir {
        Some(dir) => {
            let store = JsonDirGameStore::open(dir)?;
            info!("Saving games to {}", store.dir().display());
            SyncArbiter::start(1, move || PersistenceActor::new(store.clone()))
        }
        None => {
            info!("Saving games in memory");
            SyncArbiter::start(1, || PersistenceActor::new(MemoryGameStore::new()))
        }
    };

    let mut host = Host::new(ChessEngine::new(), Box::new(storage.clone()));
    host.set_saved_games_limit(config.saved_games_limit);
    let host = HostActor::new(host, storage).start();
    let app_state = web::Data::new(AppState::new(host));

    info!("Starting server at http://{}", config.bind_address);

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .configure(configure_routes)
    })
    .bind(config.bind_address.as_str())?
    .run()
    .await?;
    Ok(())
}
