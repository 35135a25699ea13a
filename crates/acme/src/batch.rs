use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::client::AcmeClient;
use crate::error::AcmeError;

/// Yenilenecek tek bir sertifika: dizin etiketi ve kapsadığı alan adları.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateEntry {
    pub label: String,
    pub domains: Vec<String>,
}

/// Yapılandırmadaki sertifika kümesi.
///
/// İki biçim kabul edilir: `{"etiket": "alan" | ["alan", ...]}` ve
/// `["alan" | ["alan", ...], ...]`. Liste biçiminde ilk alan adı etiket olur.
/// `{"certificates": ...}` sarmalayıcısı açılır; başka her şey boş kümedir.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertificateSet {
    entries: Vec<CertificateEntry>,
}

impl CertificateSet {
    #[must_use]
    pub fn from_json_value(value: &Value) -> Self {
        let value = match value.get("certificates") {
            Some(inner) if value.is_object() && is_truthy(inner) => inner,
            _ => value,
        };
        let entries = match value {
            Value::Object(map) => map
                .iter()
                .map(|(label, domains)| CertificateEntry {
                    label: label.clone(),
                    domains: domain_list(domains),
                })
                .collect(),
            Value::Array(items) => items
                .iter()
                .map(domain_list)
                .map(|domains| CertificateEntry {
                    label: domains.first().cloned().unwrap_or_default(),
                    domains,
                })
                .collect(),
            _ => Vec::new(),
        };
        Self { entries }
    }

    #[must_use]
    pub fn entries(&self) -> &[CertificateEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<CertificateEntry> for CertificateSet {
    fn from_iter<I: IntoIterator<Item = CertificateEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::String(text) => !text.is_empty(),
        Value::Number(number) => number.as_f64().is_some_and(|n| n.abs() > 0.0),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn domain_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().map(scalar_text).collect(),
        other => vec![scalar_text(other)],
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Tek bir etiketin sonucu: `Ok(true)` yenilendi, `Ok(false)` hâlâ geçerli.
#[derive(Debug)]
pub struct BatchOutcome {
    pub label: String,
    pub result: Result<bool, AcmeError>,
}

impl BatchOutcome {
    #[must_use]
    pub const fn updated(&self) -> bool {
        matches!(self.result, Ok(true))
    }

    #[must_use]
    pub const fn skipped(&self) -> bool {
        matches!(self.result, Ok(false))
    }
}

/// Toplu çalıştırmanın özeti.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub updated: usize,
    pub errors: usize,
    pub skipped: usize,
}

impl BatchReport {
    #[must_use]
    pub fn from_outcomes(outcomes: &[BatchOutcome]) -> Self {
        outcomes.iter().fold(Self::default(), |mut report, outcome| {
            match &outcome.result {
                Ok(true) => report.updated += 1,
                Ok(false) => report.skipped += 1,
                Err(_) => report.errors += 1,
            }
            report
        })
    }
}

/// Hesabı bir kez başlatır, ardından her etiketi eşzamanlı olarak işler.
///
/// Bir etiketin hatası diğerlerini etkilemez. Rota dosyası, sonuç ne olursa
/// olsun çalıştırma sonunda temizlenir.
///
/// # Errors
///
/// Yalnızca `init` başarısız olursa hata döner; etiket hataları
/// [`BatchOutcome`] içinde raporlanır.
pub async fn run_batch(
    client: &AcmeClient,
    set: &CertificateSet,
) -> Result<(Vec<BatchOutcome>, BatchReport), AcmeError> {
    let outcomes = match client.init().await {
        Ok(_) => join_all(set.entries().iter().map(|entry| renew(client, entry))).await,
        Err(err) => {
            clear_routes(client).await;
            return Err(err);
        }
    };
    clear_routes(client).await;

    let report = BatchReport::from_outcomes(&outcomes);
    info!(
        updated = report.updated,
        errors = report.errors,
        skipped = report.skipped,
        "toplu yenileme tamamlandı"
    );
    Ok((outcomes, report))
}

async fn renew(client: &AcmeClient, entry: &CertificateEntry) -> BatchOutcome {
    let label = entry.label.as_str();
    let result = match client.is_expired(label) {
        Ok(false) => {
            debug!(label, "sertifika hâlâ geçerli, atlanıyor");
            Ok(false)
        }
        Ok(true) => client
            .generate_certificate(label, &entry.domains)
            .await
            .map(|_| true),
        Err(err) => Err(err),
    };
    if let Err(err) = &result {
        warn!(label, error = %err, "sertifika güncellenemedi");
    }
    BatchOutcome {
        label: entry.label.clone(),
        result,
    }
}

async fn clear_routes(client: &AcmeClient) {
    if let Err(err) = client.clear().await {
        warn!(error = %err, "rota dosyası temizlenemedi");
    }
}
