#![forbid(unsafe_code)]
#![deny(warnings)]
#![deny(clippy::all, clippy::pedantic, clippy::nursery)]

mod serve;
mod telemetry;

use std::error::Error as _;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use certsmith_acme::{
    run_batch, AcmeClient, AcmeError, CertificateSet, ChallengeResponder, ClientConfig,
};

use crate::telemetry::TelemetryError;

#[derive(Parser)]
#[command(
    name = "certsmith",
    version,
    about = "ACME HTTP-01 sertifika yenileme aracı"
)]
struct Cli {
    /// JSON yapılandırma dosyası (göreli yollar çalışma dizinine göre çözülür)
    #[arg(long, global = true, env = "ACME_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// HTTP-01 challenge dinleyicisini başlat
    #[command(alias = "serv")]
    Serve,
    /// Süresi dolan sertifikaları yenile
    Cert,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("yapılandırma dosyası belirtilmedi (--config veya ACME_CONFIG)")]
    MissingConfig,
    #[error("{path} okunamadı: {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path} ayrıştırılamadı: {source}")]
    ParseConfig {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("dinleme adresi geçersiz: {0}")]
    Listen(String),
    #[error("G/Ç hatası: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Acme(#[from] AcmeError),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
}

/// Dosyadan okunan istemci ayarları ve sertifika listesi.
struct FileConfig {
    client: ClientConfig,
    certificates: CertificateSet,
}

fn load_config(path: &Path) -> Result<FileConfig, CliError> {
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    let raw = fs::read_to_string(&path).map_err(|source| CliError::ReadConfig {
        path: path.clone(),
        source,
    })?;
    let value: Value = serde_json::from_str(&raw).map_err(|source| CliError::ParseConfig {
        path: path.clone(),
        source,
    })?;
    let certificates = CertificateSet::from_json_value(&value);
    let client = serde_json::from_value(value).map_err(|source| CliError::ParseConfig {
        path: path.clone(),
        source,
    })?;
    Ok(FileConfig {
        client,
        certificates,
    })
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let path = cli.config.ok_or(CliError::MissingConfig)?;
    let FileConfig {
        client,
        certificates,
    } = load_config(&path)?;

    match cli.command {
        Commands::Serve => {
            let addr = serve::listen_addr_from_env().await?;
            let responder = ChallengeResponder::new(&client.base_path)?;
            serve::serve(responder, addr).await
        }
        Commands::Cert => {
            let client = AcmeClient::new(client)?;
            info!(count = certificates.len(), "sertifikalar kontrol ediliyor");
            let (_, report) = run_batch(&client, &certificates).await?;
            println!(
                "güncellenen: {}, hatalı: {}, atlanan: {}",
                report.updated, report.errors, report.skipped
            );
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let result = match telemetry::init_tracing() {
        Ok(()) => run(cli).await,
        Err(err) => Err(err.into()),
    };
    if let Err(err) = result {
        eprintln!("hata: {err}");
        let mut source = err.source();
        while let Some(cause) = source {
            eprintln!("  neden: {cause}");
            source = cause.source();
        }
        std::process::exit(1);
    }
}
