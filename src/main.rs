use actix_web::{middleware, web, App, HttpServer};
use broadcast_service::{logging, routes, AppState, Config};
use std::io;

#[actix_web::main]
async fn main() -> io::Result<()> {
    logging::init_tracing();

    tracing::info!("Starting broadcast service");

    let config = Config::from_env()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;

    let addr = format!("0.0.0.0:{}", config.port);
    let state = AppState::new(config);

    tracing::info!("Starting HTTP server on {}", addr);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(middleware::Logger::default())
            .route("/health", web::get().to(routes::health::health))
            .route("/", web::get().to(|| async { "Broadcast Service v1.0" }))
            .service(routes::wsroute::ws_handler)
    })
    .bind(&addr)?
    .run()
    .await
}
