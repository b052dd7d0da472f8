// main.rs - entry point to run the API server

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use clap::{Parser, ValueEnum};
use dotenvy::dotenv;
use mongodb::Collection;
use std::io;
use tracing::subscriber::set_global_default;
use tracing::{info, warn};
use tracing_actix_web::TracingLogger;
use tracing_log::LogTracer;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

mod auth;
mod config;
mod costs;
mod error;
mod mailer;
mod models;
mod otp;
mod password;
mod routes;
mod utils;

use config::{AuthSettings, Config, ImageKitSettings};
use database::{
    auth::model::{RefreshTokenModel, INVALID_REFRESH_TOKENS_COLLECTION},
    create_indexes, set_ttl_index,
};
use mailer::Mailer;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Environment {
    Local,
    Staging,
    Production,
}

#[derive(Parser, Debug)]
struct Args {
    /// Database URI and Name
    #[arg(
        long,
        env = "DATABASE_URI",
        default_value = "mongodb://localhost:27017"
    )]
    database_uri: String,
    #[arg(long, env = "DATABASE_NAME", default_value = "build-tracker")]
    database_name: String,
    /// Environment
    #[arg(long, env = "ENVIRONMENT", value_enum, default_value = "local")]
    environment: Environment,
    #[arg(long, env = "PORT", default_value_t = 8081)]
    port: u16,
    /// Origins allowed by CORS outside of local, comma separated
    #[arg(long, env = "ALLOWED_ORIGINS", value_delimiter = ',')]
    allowed_origins: Vec<String>,

    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    jwt_secret: String,
    /// Lifetimes in seconds
    #[arg(long, env = "ACCESS_TOKEN_TTL", default_value_t = 3600)]
    access_token_ttl: i64,
    #[arg(long, env = "REFRESH_TOKEN_TTL", default_value_t = 604800)]
    refresh_token_ttl: i64,

    #[arg(long, env = "IMAGEKIT_PUBLIC_KEY")]
    imagekit_public_key: Option<String>,
    #[arg(long, env = "IMAGEKIT_PRIVATE_KEY", hide_env_values = true)]
    imagekit_private_key: Option<String>,
    #[arg(long, env = "IMAGEKIT_URL_ENDPOINT")]
    imagekit_url_endpoint: Option<String>,

    #[arg(long, env = "MAIL_API_URL")]
    mail_api_url: Option<String>,
    #[arg(long, env = "MAIL_API_KEY", hide_env_values = true)]
    mail_api_key: Option<String>,
    #[arg(long, env = "MAIL_FROM", default_value = "no-reply@build-tracker.app")]
    mail_from: String,
}

fn startup_error(context: &str, e: impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::Other, format!("{}: {}", context, e))
}

fn cors_for(environment: Environment, allowed_origins: &[String]) -> Cors {
    if environment == Environment::Local {
        return Cors::permissive();
    }

    allowed_origins
        .iter()
        .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
        .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE"])
        .allow_any_header()
        .max_age(3600)
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    // Load environment variables from .env file if local
    dotenv().ok();

    // Parse CLI args, using ENV vars if not provided
    let args = Args::parse();

    // Adds log tracer as the default tracer for the log crate
    LogTracer::init().map_err(|e| startup_error("Failed to set log tracer", e))?;
    // Set log level based on env variable
    let env_layer = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| startup_error("Invalid log filter", e))?;
    let fmt_layer = fmt::layer().with_target(false);
    let subscriber = Registry::default().with(env_layer).with(fmt_layer);
    set_global_default(subscriber).map_err(|e| startup_error("Failed to set subscriber", e))?;

    let client = mongodb::Client::with_uri_str(&args.database_uri)
        .await
        .map_err(|e| startup_error("Failed to connect to database", e))?;

    create_indexes(&client, &args.database_name)
        .await
        .map_err(|e| startup_error("Failed to create indexes", e))?;

    // Used refresh tokens only need remembering for as long as they could still be valid
    let invalid_refresh_tokens: Collection<RefreshTokenModel> = client
        .database(&args.database_name)
        .collection(INVALID_REFRESH_TOKENS_COLLECTION);
    set_ttl_index(invalid_refresh_tokens, args.refresh_token_ttl.max(0) as u64)
        .await
        .map_err(|e| startup_error("Failed to set TTL index", e))?;

    let mailer = Mailer::from_settings(args.mail_api_url, args.mail_api_key, args.mail_from);
    if matches!(mailer, Mailer::Log) && args.environment != Environment::Local {
        warn!("MAIL_API_URL or MAIL_API_KEY missing; codes will only be written to the log");
    }

    let auth = AuthSettings {
        jwt_secret: args.jwt_secret,
        access_token_ttl: args.access_token_ttl,
        refresh_token_ttl: args.refresh_token_ttl,
    };

    let config = Config {
        client,
        database: args.database_name,
        auth: auth.clone(),
        imagekit: ImageKitSettings {
            public_key: args.imagekit_public_key,
            private_key: args.imagekit_private_key,
            url_endpoint: args.imagekit_url_endpoint,
        },
        mailer,
    };

    let (json_cfg, path_cfg, query_cfg) = routes::extractor_configs();

    let host = match args.environment {
        Environment::Local => "127.0.0.1",
        Environment::Staging | Environment::Production => "0.0.0.0",
    };
    info!(
        "Starting API on {}:{} ({:?})",
        host, args.port, args.environment
    );

    let environment = args.environment;
    let allowed_origins = args.allowed_origins;
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(config.clone()))
            .app_data(web::Data::new(auth.clone()))
            .app_data(json_cfg.clone())
            .app_data(path_cfg.clone())
            .app_data(query_cfg.clone())
            .wrap(TracingLogger::default())
            .wrap(cors_for(environment, &allowed_origins))
            .configure(routes::configure)
    })
    .bind((host, args.port))?
    .run()
    .await
}
