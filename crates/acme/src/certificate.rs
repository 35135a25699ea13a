#![allow(clippy::module_name_repetitions)]

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::warn;
use x509_parser::certificate::X509Certificate;
use x509_parser::prelude::FromDer;

use crate::store::{Scope, StagedWrite, StoreError};

/// Sertifika kaydının JSON dosyası.
pub const CERT_JSON_FILE: &str = "cert.json";
/// Alan adı özel anahtarı (PEM).
pub const CERT_KEY_FILE: &str = "cert.key";
/// CA'dan indirilen tam zincir.
pub const CERT_PEM_FILE: &str = "cert.pem";
/// Zincirin ilk (yaprak) sertifikası.
pub const CERT_CRT_FILE: &str = "cert.crt";
/// Zincirin ikinci (düzenleyen) sertifikası.
pub const CERT_CA_FILE: &str = "cert.ca";

/// Kalan süre bu değerin altına düştüğünde sertifika yenilenir.
pub const DEFAULT_RENEWAL_THRESHOLD: Duration = Duration::days(30);

/// Bir kaydın etiket dizininde sahip olduğu dosyalar.
const RECORD_FILES: [&str; 5] = [
    CERT_CRT_FILE,
    CERT_CA_FILE,
    CERT_PEM_FILE,
    CERT_KEY_FILE,
    CERT_JSON_FILE,
];

const BEGIN_CERTIFICATE: &str = "-----BEGIN CERTIFICATE-----";
const END_CERTIFICATE: &str = "-----END CERTIFICATE-----";
const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Debug, Error)]
pub enum CertificateError {
    #[error("sertifika zinciri PEM verisi geçersiz: {0}")]
    InvalidPem(#[from] pem::PemError),
    #[error("sertifika zincirinde CERTIFICATE bloğu yok")]
    EmptyChain,
    #[error("beklenen CERTIFICATE etiketi, bulundu {0}")]
    UnexpectedTag(String),
    #[error("X.509 sertifikası çözümlenemedi: {0}")]
    InvalidCertificate(String),
}

/// Üretilen alan adı anahtar çiftinin PEM gösterimleri.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPairPem {
    pub private_key_pem: String,
    pub public_key_pem: String,
}

impl fmt::Debug for KeyPairPem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPairPem")
            .field("public_key_pem", &self.public_key_pem)
            .finish_non_exhaustive()
    }
}

/// Bir etiket için başarıyla alınmış sertifika ve anahtar materyali.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateRecord {
    pub key: String,
    pub domains: Vec<String>,
    pub keypair: KeyPairPem,
    pub cert: String,
}

impl CertificateRecord {
    /// Kaydı etiket dizinine yazar.
    ///
    /// Tüm dosyalar önce geçici olarak hazırlanır, sonra `cert.crt`/`cert.ca`,
    /// `cert.pem`, `cert.key` ve en son `cert.json` yerine taşınır. Zincir
    /// bölünemiyorsa önceki kayıttan kalan `cert.crt`/`cert.ca` silinir.
    /// Taşıma yarıda kalırsa önceki dosyalar geri yüklenir; anahtar ve zincir
    /// farklı kayıtlardan kalmaz.
    ///
    /// # Errors
    ///
    /// Serileştirme veya dosya işlemleri başarısız olursa `StoreError`.
    pub fn persist(&self, scope: &Scope) -> Result<(), StoreError> {
        let json = serde_json::to_vec(self).map_err(|source| StoreError::Json {
            path: scope.path(CERT_JSON_FILE),
            source,
        })?;

        let mut plan: Vec<(&str, Option<StagedWrite>)> = Vec::with_capacity(RECORD_FILES.len());
        match split_chain(&self.cert) {
            Some((leaf, issuer)) => {
                plan.push((CERT_CRT_FILE, Some(scope.stage(CERT_CRT_FILE, leaf.as_bytes())?)));
                plan.push((CERT_CA_FILE, Some(scope.stage(CERT_CA_FILE, issuer.as_bytes())?)));
            }
            None => {
                plan.push((CERT_CRT_FILE, None));
                plan.push((CERT_CA_FILE, None));
            }
        }
        plan.push((CERT_PEM_FILE, Some(scope.stage(CERT_PEM_FILE, self.cert.as_bytes())?)));
        plan.push((
            CERT_KEY_FILE,
            Some(scope.stage(CERT_KEY_FILE, self.keypair.private_key_pem.as_bytes())?),
        ));
        plan.push((CERT_JSON_FILE, Some(scope.stage(CERT_JSON_FILE, &json)?)));

        let previous = snapshot(scope)?;
        for (name, staged) in plan {
            let step = match staged {
                Some(staged) => staged.commit(),
                None => scope.remove(name),
            };
            if let Err(err) = step {
                restore(scope, &previous);
                return Err(err);
            }
        }
        Ok(())
    }

    /// # Errors
    ///
    /// `cert.json` okunamazsa veya çözümlenemezse `StoreError`.
    pub fn load(scope: &Scope) -> Result<Self, StoreError> {
        scope.read_json(CERT_JSON_FILE)
    }
}

/// Etiket dizinindeki kayıt dosyalarının mevcut içerikleri.
fn snapshot(scope: &Scope) -> Result<Vec<(&'static str, Option<Vec<u8>>)>, StoreError> {
    RECORD_FILES
        .iter()
        .map(|&name| {
            let contents = if scope.path(name).is_file() {
                Some(scope.read(name)?)
            } else {
                None
            };
            Ok((name, contents))
        })
        .collect()
}

fn restore(scope: &Scope, previous: &[(&'static str, Option<Vec<u8>>)]) {
    for (name, contents) in previous {
        let result = match contents {
            Some(bytes) => scope.stage(name, bytes).and_then(StagedWrite::commit),
            None => scope.remove(name),
        };
        if let Err(err) = result {
            warn!(file = name, error = %err, "önceki sertifika dosyası geri yüklenemedi");
        }
    }
}

/// Zincir iki ardışık sertifika bloğuyla başlıyorsa yaprak ve düzenleyen
/// sertifikayı ayrı PEM metinleri olarak döndürür.
///
/// Bloklar arasında yalnızca satır sonları bulunabilir.
#[must_use]
pub fn split_chain(chain: &str) -> Option<(String, String)> {
    let (first, rest) = next_block(chain)?;
    let next = rest.trim_start_matches(['\r', '\n']);
    if next.len() == rest.len() || !next.starts_with(BEGIN_CERTIFICATE) {
        return None;
    }
    let (second, _) = next_block(next)?;
    Some((wrap_block(first), wrap_block(second)))
}

/// İlk `BEGIN`/`END` çiftinin gövdesini ve sonrasını döndürür.
fn next_block(text: &str) -> Option<(&str, &str)> {
    let start = text.find(BEGIN_CERTIFICATE)? + BEGIN_CERTIFICATE.len();
    let body_len = text[start..].find(END_CERTIFICATE)?;
    let body = &text[start..start + body_len];
    let rest = &text[start + body_len + END_CERTIFICATE.len()..];
    Some((body, rest))
}

fn wrap_block(body: &str) -> String {
    format!("{BEGIN_CERTIFICATE}{body}{END_CERTIFICATE}\n")
}

/// Zincirdeki ilk sertifikanın `notAfter` zamanını döndürür.
///
/// # Errors
///
/// PEM çözülemezse, sertifika bloğu yoksa ya da DER geçersizse `CertificateError`.
pub fn leaf_not_after(chain: &str) -> Result<OffsetDateTime, CertificateError> {
    let blocks = pem::parse_many(chain.as_bytes())?;
    let leaf = blocks.first().ok_or(CertificateError::EmptyChain)?;
    if leaf.tag() != "CERTIFICATE" {
        return Err(CertificateError::UnexpectedTag(leaf.tag().to_owned()));
    }
    let (_, certificate) = X509Certificate::from_der(leaf.contents())
        .map_err(|err| CertificateError::InvalidCertificate(err.to_string()))?;
    Ok(certificate.validity().not_after.to_datetime())
}

/// İndirilen zincirin en az bir geçerli sertifika içerdiğini doğrular.
///
/// # Errors
///
/// Zincir boşsa veya CERTIFICATE dışında bir blok içeriyorsa `CertificateError`.
pub fn validate_chain(chain: &str) -> Result<usize, CertificateError> {
    let blocks = pem::parse_many(chain.as_bytes())?;
    if blocks.is_empty() {
        return Err(CertificateError::EmptyChain);
    }
    if let Some(other) = blocks.iter().find(|block| block.tag() != "CERTIFICATE") {
        return Err(CertificateError::UnexpectedTag(other.tag().to_owned()));
    }
    Ok(blocks.len())
}

/// `not_after` ile `now` arasındaki gün farkı, en yakın güne yuvarlanır.
#[must_use]
pub fn remaining_days(not_after: OffsetDateTime, now: OffsetDateTime) -> i64 {
    let seconds = (not_after - now).whole_seconds();
    (seconds + SECONDS_PER_DAY / 2).div_euclid(SECONDS_PER_DAY)
}

/// Süresi dolmuş veya eşikten az gün kalmış sertifikalar için `true`.
#[must_use]
pub fn needs_renewal(not_after: OffsetDateTime, now: OffsetDateTime) -> bool {
    not_after <= now || remaining_days(not_after, now) < DEFAULT_RENEWAL_THRESHOLD.whole_days()
}
