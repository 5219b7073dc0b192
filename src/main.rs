//src/main.rs

use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod routes;
mod services;

use crate::config::{AppState, Config};
use crate::services::invoice_service::InvoiceService;

// Varredura periódica: faturas enviadas/parciais com vencimento passado viram "overdue"
fn spawn_overdue_sweep(invoice_service: InvoiceService, interval_secs: u64) {
    if interval_secs == 0 {
        tracing::info!("⏸️ Varredura de faturas vencidas desativada");
        return;
    }

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        loop {
            ticker.tick().await;
            if let Err(e) = invoice_service.mark_overdue().await {
                tracing::error!("🔥 Falha na varredura de vencidas: {:?}", e);
            }
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")),
        )
        .with_target(false)
        .compact()
        .init();

    let config = Config::from_env().context("Falha ao carregar a configuração")?;
    let server_addr = config.server_addr.clone();
    let sweep_interval = config.overdue_sweep_interval_secs;
    let bootstrap_admin = config.bootstrap_admin.clone();

    let app_state = AppState::new(config).await?;

    // Faz o app rodar as migrações do SQLx na inicialização
    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .context("Falha ao rodar as migrações do banco de dados")?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    if let Some(admin) = bootstrap_admin {
        app_state
            .auth_service
            .ensure_bootstrap_admin(&admin)
            .await
            .context("Falha ao criar o administrador inicial")?;
    }

    spawn_overdue_sweep(app_state.invoice_service.clone(), sweep_interval);

    let app = routes::build_router(app_state);

    let listener = TcpListener::bind(&server_addr)
        .await
        .with_context(|| format!("Falha ao iniciar o listener TCP em {server_addr}"))?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("Erro no servidor Axum")?;
    Ok(())
}
