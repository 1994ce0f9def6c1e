#[macro_use]
extern crate lazy_static;

use actix_identity::IdentityMiddleware;
use actix_session::{storage::CookieSessionStore, SessionMiddleware};
use actix_web::{
    cookie::SameSite,
    middleware,
    web::{self, Data},
    App, HttpServer,
};
use log::info;
use sqlx::SqlitePool;
use tera::Tera;

mod auth;
mod config;
mod db;
mod errors;
mod flash;
mod forms;
mod routes;
mod scan;
mod search;
mod structs;
mod transfer;
mod utils;

use config::Config;

#[derive(Debug, Clone)]
pub struct AppState {
    pub db_pool: SqlitePool,
}

lazy_static! {
    pub static ref TEMPLATES: Tera = {
        let mut tera = match Tera::new("templates/**/*") {
            Ok(t) => t,
            Err(e) => {
                log::error!("Parsing error(s): {}", e);
                ::std::process::exit(1);
            }
        };
        tera.autoescape_on(vec![".html"]);
        tera
    };
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    info!("Inventory application startup");

    let config = Config::from_env()?;
    let db_pool = db::connect(&config.database_url).await?;
    db::seed_admin(&db_pool, &config.admin_email, &config.admin_password).await?;

    // Fail on template errors now rather than on the first request.
    lazy_static::initialize(&TEMPLATES);

    info!("Starting HTTP server on http://{}:{}/", config.host, config.port);

    let session_key = config.session_key.clone();
    let cookie_secure = config.cookie_secure;
    HttpServer::new(move || {
        App::new()
            // enable automatic response compression - usually register this first
            .wrap(middleware::Compress::default())
            .wrap(IdentityMiddleware::default())
            .wrap(
                SessionMiddleware::builder(CookieSessionStore::default(), session_key.clone())
                    .cookie_same_site(SameSite::Strict)
                    .cookie_http_only(true)
                    .cookie_secure(cookie_secure)
                    .build(),
            )
            // enable logger - always register Actix Web Logger middleware last
            .wrap(middleware::Logger::default())
            .app_data(Data::new(AppState {
                db_pool: db_pool.clone(),
            }))
            .configure(routes::configure)
            .default_service(web::to(routes::default_handler))
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
