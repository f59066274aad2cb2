use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Compress, web, App, HttpServer};
use tracing::{info, Level};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi; // ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

use carehub::identity::{IdentityProvider, InMemIdentity};
use carehub::mailer::{LogMailer, Mailer, WebhookMailer};
use carehub::openapi::ApiDoc;
use carehub::repo::inmem::InMemRepo;
use carehub::{config, telemetry, AppConfig, AppState, SecurityHeaders};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // .env is a development convenience; deployments set the environment directly.
    if cfg!(debug_assertions) {
        let _ = dotenv::dotenv();
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    if let Err(e) = AppConfig::validate() {
        tracing::error!(error = %e, "refusing to start");
        anyhow::bail!(e);
    }
    let cfg = AppConfig::from_env();
    info!(bind = %cfg.bind_addr, frontend = %cfg.frontend_url, data_dir = %cfg.data_dir.display(), "bootstrapping carehub");

    telemetry::install()?;

    let repo = InMemRepo::open(&cfg.data_dir)?;
    let identity: Arc<dyn IdentityProvider> = Arc::new(InMemIdentity::open(&cfg.data_dir)?);
    let mailer: Arc<dyn Mailer> = match &cfg.mail_webhook_url {
        Some(url) => {
            info!("password reset mail goes through the webhook relay");
            Arc::new(WebhookMailer::new(url.clone())?)
        }
        None => {
            info!("MAIL_WEBHOOK_URL not set; reset links are only logged");
            Arc::new(LogMailer)
        }
    };
    let state = web::Data::new(AppState::new(Arc::new(repo), identity, mailer, &cfg));
    let openapi = ApiDoc::openapi();

    let bind_addr = cfg.bind_addr.clone();
    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&cfg.frontend_url)
            .allowed_origin("http://localhost:5173")
            .allowed_origin("http://127.0.0.1:5173")
            .allow_any_header()
            .allowed_methods(["GET", "POST", "PATCH", "DELETE", "OPTIONS"])
            .max_age(3600);

        App::new()
            .wrap(TracingLogger::default())
            .wrap(Compress::default())
            .wrap(SecurityHeaders::new(cfg.enable_hsts))
            .wrap(cors)
            .app_data(state.clone())
            .configure(config)
            .service(SwaggerUi::new("/docs/{_:.*}").url("/docs/openapi.json", openapi.clone()))
    })
    .bind(&bind_addr)?;

    info!("listening on http://{bind_addr}");
    server.run().await?;
    Ok(())
}
