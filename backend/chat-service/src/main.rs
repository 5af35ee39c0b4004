use actix_web::{web, App, HttpServer};
use chat_service::{
    config, db, error, logging,
    repository::{InMemoryMessageRepository, MessageRepository, PgMessageRepository},
    routes,
    services::{IdentityLookup, InMemoryDirectory, PgProfileDirectory},
    state::AppState,
};
use std::sync::Arc;

#[actix_web::main]
async fn main() -> Result<(), error::AppError> {
    logging::init_tracing();
    let cfg = Arc::new(config::Config::from_env()?);

    let (repo, identity): (Arc<dyn MessageRepository>, Arc<dyn IdentityLookup>) = match &cfg.db
    {
        Some(db_cfg) => {
            let pool = db::init_pool(db_cfg).await?;
            (
                Arc::new(PgMessageRepository::new(pool.clone())),
                Arc::new(PgProfileDirectory::new(pool)),
            )
        }
        None => {
            tracing::warn!(
                seed_users = cfg.seed_users.len(),
                "DATABASE_URL not set, messages are kept in memory only"
            );
            (
                Arc::new(InMemoryMessageRepository::new()),
                Arc::new(InMemoryDirectory::with_users(&cfg.seed_users)),
            )
        }
    };

    let state = AppState::new(cfg.clone(), repo, identity);

    let bind_addr = format!("0.0.0.0:{}", cfg.port);
    tracing::info!(%bind_addr, "starting chat-service");

    HttpServer::new(move || {
        let cors = actix_cors::Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(cors)
            .wrap(actix_web::middleware::Logger::default())
            .app_data(web::Data::new(state.clone()))
            .configure(routes::configure)
    })
    .bind(&bind_addr)
    .map_err(|e| error::AppError::StartServer(format!("bind REST: {e}")))?
    .run()
    .await
    .map_err(|e| error::AppError::StartServer(format!("REST server: {e}")))
}
