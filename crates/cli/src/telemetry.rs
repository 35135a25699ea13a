use std::env;

use thiserror::Error;
use tracing::subscriber::{set_global_default, SetGlobalDefaultError};
use tracing_subscriber::filter::{EnvFilter, ParseError};
use tracing_subscriber::fmt::time::SystemTime;
use tracing_subscriber::layer::SubscriberExt;

/// Log aboneliği kurulurken oluşabilecek hatalar.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("log filtresi geçersiz: {0}")]
    InvalidFilter(#[from] ParseError),
    #[error("tracing aboneliği kurulamadı: {0}")]
    Subscriber(#[from] SetGlobalDefaultError),
}

/// `CERTSMITH_LOG`, yoksa `RUST_LOG` filtresiyle global aboneliği kurar.
/// İkisi de yoksa `info` kullanılır.
///
/// # Errors
///
/// Filtre ayrıştırılamazsa veya abonelik zaten kuruluysa hata döner.
pub fn init_tracing() -> Result<(), TelemetryError> {
    let filter = env::var("CERTSMITH_LOG")
        .or_else(|_| env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_owned());
    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::try_new(filter)?)
        .with(
            tracing_subscriber::fmt::layer()
                .with_timer(SystemTime)
                .with_target(true)
                .with_writer(std::io::stderr),
        );
    set_global_default(subscriber)?;
    Ok(())
}
