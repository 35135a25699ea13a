use thiserror::Error;

use crate::authorization::AuthorizationError;
use crate::certificate::CertificateError;
use crate::csr::CsrError;
use crate::directory::AcmeDirectoryError;
use crate::http::TransportError;
use crate::jws::JwsError;
use crate::nonce::NonceError;
use crate::order::OrderError;
use crate::store::StoreError;

/// Sertifika istemcisinin tüm genel işlemlerinden dönen hata türü.
#[derive(Debug, Error)]
pub enum AcmeError {
    /// Eksik veya hatalı yapılandırma; tekrar denenmez.
    #[error("yapılandırma hatası: {0}")]
    Configuration(String),
    /// Hesap başlatılmadan sertifika işlemi istendi.
    #[error("istemci başlatılmadı")]
    NotInitialized,
    /// CA beklenmeyen ya da hatalı bir yanıt döndürdü.
    #[error("ACME protokol hatası: {0}")]
    Protocol(String),
    /// Operatörün kendi HTTP-01 uç noktası erişilemez veya yanlış içerik döndürüyor.
    #[error("yerel HTTP-01 doğrulaması başarısız ({domain}): {reason}")]
    LocalValidation {
        /// Kontrol edilen alan adı.
        domain: String,
        /// Başarısızlık nedeni.
        reason: String,
    },
    /// CA, deneme bütçesi içinde challenge'ı geçerli saymadı.
    #[error("challenge {attempts} denemede doğrulanamadı: {url}")]
    ValidationTimeout {
        /// Challenge URL'i.
        url: String,
        /// Tüketilen deneme sayısı.
        attempts: u32,
    },
    /// Dosya sistemi üzerinde okuma ya da yazma başarısız oldu.
    #[error("kalıcı depolama hatası: {0}")]
    Persistence(#[source] StoreError),
    /// CA'ya ya da yerel uç noktaya hiç ulaşılamadı.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Hesap anahtarı veya JWS üretimi başarısız oldu.
    #[error(transparent)]
    Signing(#[from] JwsError),
    /// Alan adı anahtarı ya da CSR üretilemedi.
    #[error(transparent)]
    Csr(#[from] CsrError),
    /// Saklanan veya indirilen sertifika zinciri çözümlenemedi.
    #[error(transparent)]
    Certificate(#[from] CertificateError),
}

impl AcmeError {
    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    pub(crate) fn local_validation(domain: &str, reason: impl Into<String>) -> Self {
        Self::LocalValidation {
            domain: domain.to_owned(),
            reason: reason.into(),
        }
    }
}

impl From<StoreError> for AcmeError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::EmptyBasePath
            | StoreError::MissingBasePath { .. }
            | StoreError::UnsupportedFormat(_) => Self::Configuration(err.to_string()),
            other => Self::Persistence(other),
        }
    }
}

impl From<AcmeDirectoryError> for AcmeError {
    fn from(err: AcmeDirectoryError) -> Self {
        Self::Protocol(err.to_string())
    }
}

impl From<NonceError> for AcmeError {
    fn from(err: NonceError) -> Self {
        Self::Protocol(err.to_string())
    }
}

impl From<AuthorizationError> for AcmeError {
    fn from(err: AuthorizationError) -> Self {
        Self::Protocol(err.to_string())
    }
}

impl From<OrderError> for AcmeError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::Identifier(inner) => Self::Configuration(inner.to_string()),
            other => Self::Protocol(other.to_string()),
        }
    }
}
