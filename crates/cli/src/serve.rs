//! HTTP-01 dinleyicisi: challenge sorgularını yanıtlar, diğer her şeye 404.

use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::extract::State;
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use certsmith_acme::ChallengeResponder;
use tokio::net::{lookup_host, TcpListener};
use tracing::{error, info};

use crate::CliError;

pub const DEFAULT_HTTP_PORT: u16 = 80;
pub const DEFAULT_HTTP_HOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

/// `ACME_HTTP_HOST` ve `ACME_HTTP_PORT` değişkenlerinden dinleme adresi.
///
/// Host bir IP adresi ya da `localhost` gibi çözümlenebilir bir ad olabilir;
/// ad verilirse ilk çözümlenen adres kullanılır.
///
/// # Errors
///
/// Port ayrıştırılamazsa veya host çözümlenemezse `CliError::Listen`.
pub async fn listen_addr_from_env() -> Result<SocketAddr, CliError> {
    let host = env::var("ACME_HTTP_HOST").ok();
    let port = env::var("ACME_HTTP_PORT").ok();
    listen_addr(host.as_deref(), port.as_deref()).await
}

async fn listen_addr(host: Option<&str>, port: Option<&str>) -> Result<SocketAddr, CliError> {
    let port = match port.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => value
            .parse()
            .map_err(|_| CliError::Listen(format!("ACME_HTTP_PORT geçersiz: {value}")))?,
        None => DEFAULT_HTTP_PORT,
    };
    let Some(host) = host.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(SocketAddr::new(DEFAULT_HTTP_HOST, port));
    };
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, port));
    }
    let mut resolved = lookup_host((host, port))
        .await
        .map_err(|err| CliError::Listen(format!("ACME_HTTP_HOST çözümlenemedi: {host}: {err}")))?;
    resolved
        .next()
        .ok_or_else(|| CliError::Listen(format!("ACME_HTTP_HOST için adres yok: {host}")))
}

pub fn build_router(responder: Arc<ChallengeResponder>) -> Router {
    Router::new().fallback(answer).with_state(responder)
}

async fn answer(
    State(responder): State<Arc<ChallengeResponder>>,
    method: Method,
    uri: Uri,
) -> Response {
    // Rota dosyası her istekte diskten okunur.
    let lookup = {
        let method = method.clone();
        let path = uri.path().to_owned();
        tokio::task::spawn_blocking(move || responder.respond(&method, &path))
    };
    match lookup.await {
        Ok(Some(response)) => response.into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, format!("Cannot {method} {uri}")).into_response(),
        Err(err) => {
            error!(error = %err, "challenge yanıtı üretilemedi");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Dinleyiciyi başlatır ve Ctrl-C gelene kadar çalıştırır.
///
/// # Errors
///
/// Adres bağlanamazsa veya sunucu hata verirse `CliError::Io`.
pub async fn serve(responder: ChallengeResponder, addr: SocketAddr) -> Result<(), CliError> {
    let router = build_router(Arc::new(responder));
    let listener = TcpListener::bind(addr).await?;
    info!(address = %addr, "HTTP-01 dinleyicisi başladı");
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("kapatma sinyali alındı");
        })
        .await?;
    Ok(())
}
