use std::{env, net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum_server::{tls_rustls::RustlsConfig, Handle};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use urlinfo::{
    approval::ApprovalService,
    memory_db::MemoryStore,
    preferences::{Preferences, StoreKind},
    routes,
    url_db::{PgUrlStore, UrlStore},
};

const CONFIG_ENV: &str = "URLINFO_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "./config.toml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = env::var(CONFIG_ENV).unwrap_or_else(|_| String::from(DEFAULT_CONFIG_PATH));
    let prefs = Preferences::load_config(&config_path)
        .with_context(|| format!("could not load config from {config_path}"))?;

    tracing_subscriber::fmt()
        .with_max_level(prefs.log_level())
        .init();
    info!("config loaded from {config_path}");

    let store = build_store(&prefs).await;
    let approvals = ApprovalService::new(store.clone());
    if prefs.enable_test_data() {
        warn!("/add_test_data is enabled, calling it wipes the url store");
    }
    let app = routes::router(approvals, prefs.enable_test_data());

    let addr = SocketAddr::new(
        prefs
            .http_ip()
            .parse()
            .context("could not parse http_ip")?,
        prefs.port(),
    );

    match prefs.tls_paths() {
        Some((cert, key)) => {
            let tls = RustlsConfig::from_pem_file(cert, key)
                .await
                .context("could not load TLS certificate and key")?;
            let handle = Handle::new();
            tokio::spawn(shutdown_tls(handle.clone()));

            info!("listening on https://{addr}");
            axum_server::bind_rustls(addr, tls)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .context("error while running https server")?;
        }
        None => {
            let listener = TcpListener::bind(addr)
                .await
                .with_context(|| format!("could not bind to {addr}"))?;

            info!("listening on http://{addr}");
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
                .context("error while running http server")?;
        }
    }

    store.close().await;
    info!("url store closed");
    Ok(())
}

async fn build_store(prefs: &Preferences) -> Arc<dyn UrlStore> {
    match prefs.store() {
        StoreKind::Memory => {
            info!("using in-memory url store");
            Arc::new(MemoryStore::new())
        }
        StoreKind::Postgres => {
            if prefs.uses_default_password() {
                warn!("Using default database password. \x1b[1mTHIS MUST BE CHANGED!!!\x1b[0m");
            }
            let store = PgUrlStore::connect_lazy(prefs);
            if prefs.run_migrations() {
                match store.run_migrations().await {
                    Ok(()) => info!("migrations successfully run"),
                    Err(err) => error!("could not run migrations: {err}"),
                }
            }
            Arc::new(store)
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("could not listen for ctrl-c: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

async fn shutdown_tls(handle: Handle) {
    shutdown_signal().await;
    handle.graceful_shutdown(Some(Duration::from_secs(10)));
}
