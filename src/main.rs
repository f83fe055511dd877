//! CourseDesk - Main Entry Point

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::http::{header, Method};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use coursedesk_backend::{
    api,
    config::Config,
    db,
    error::Result,
    services::auth_service::AuthService,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coursedesk_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Starting CourseDesk");

    // Connect to database
    let db_pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("./migrations").run(&db_pool).await?;
    tracing::info!("Database migrations complete");

    // Ensure the upload directory exists before serving from it
    tokio::fs::create_dir_all(&config.upload_path).await?;

    // Provision admin user on first boot
    provision_admin_user(&db_pool, &config.upload_path).await?;

    // Create application state
    let state = Arc::new(api::AppState::new(config.clone(), db_pool));

    // Build router
    let app = Router::new()
        .merge(api::routes::create_router(state))
        .layer({
            // In production the frontend is served from the same origin. In
            // development the Vite dev server runs on a different port, so
            // its origin must be whitelisted explicitly.
            match &config.cors_origins {
                Some(origins) => {
                    let origins: Vec<_> = origins
                        .split(',')
                        .map(|s| s.trim().parse().expect("invalid CORS origin"))
                        .collect();
                    CorsLayer::new()
                        .allow_origin(AllowOrigin::list(origins))
                        .allow_methods([
                            Method::GET,
                            Method::POST,
                            Method::PATCH,
                            Method::DELETE,
                            Method::OPTIONS,
                        ])
                        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
                }
                None => CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            }
        })
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr: SocketAddr = config.bind_address.parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Provision the initial admin user on first boot.
///
/// Uses `ADMIN_PASSWORD` when set; otherwise generates a password and writes
/// it to a file under the upload root so the operator can retrieve it.
async fn provision_admin_user(db: &sqlx::PgPool, upload_path: &str) -> Result<()> {
    let existing: Option<uuid::Uuid> =
        sqlx::query_scalar("SELECT id FROM users WHERE role = 'admin' LIMIT 1")
            .fetch_optional(db)
            .await
            .map_err(|e| coursedesk_backend::error::AppError::Database(e.to_string()))?;

    if existing.is_some() {
        return Ok(());
    }

    let (password, generated) = match std::env::var("ADMIN_PASSWORD") {
        Ok(p) if !p.is_empty() => (p, false),
        _ => {
            use rand::Rng;
            const CHARSET: &[u8] =
                b"abcdefghijkmnopqrstuvwxyzABCDEFGHJKLMNPQRSTUVWXYZ23456789!@#$%&*";
            let mut rng = rand::rng();
            let p: String = (0..20)
                .map(|_| {
                    let idx = rng.random_range(0..CHARSET.len());
                    CHARSET[idx] as char
                })
                .collect();
            (p, true)
        }
    };

    let password_hash = AuthService::hash_password(&password)?;

    sqlx::query(
        r#"
        INSERT INTO users (name, email, password_hash, role)
        VALUES ('Administrator', 'admin@localhost', $1, 'admin')
        ON CONFLICT (email) DO NOTHING
        "#,
    )
    .bind(&password_hash)
    .execute(db)
    .await
    .map_err(|e| coursedesk_backend::error::AppError::Database(e.to_string()))?;

    if generated {
        let password_file = Path::new(upload_path).join("admin.password");
        if let Err(e) = std::fs::write(&password_file, format!("{}\n", password)) {
            tracing::error!("Failed to write admin password file: {}", e);
            tracing::info!("Generated admin password: {}", password);
        } else {
            tracing::info!("Admin password written to: {}", password_file.display());
        }
    } else {
        tracing::info!("Admin user created with password from ADMIN_PASSWORD env var");
    }

    Ok(())
}
