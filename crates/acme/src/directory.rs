use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum AcmeDirectoryError {
    #[error("directory belgesi çözümlenemedi: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{field} geçerli bir URL değil: {source}")]
    InvalidUrl {
        field: &'static str,
        #[source]
        source: url::ParseError,
    },
    #[error("Geçersiz directory: {0} listelenmemiş")]
    UnknownEndpoint(&'static str),
}

/// İstemcinin adıyla bildiği directory girdileri.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnownEndpoint {
    NewNonce,
    NewAccount,
    NewOrder,
    NewAuthz,
    RevokeCert,
    KeyChange,
}

impl KnownEndpoint {
    /// Directory belgesindeki anahtar.
    #[must_use]
    pub const fn as_key(self) -> &'static str {
        match self {
            Self::NewNonce => "newNonce",
            Self::NewAccount => "newAccount",
            Self::NewOrder => "newOrder",
            Self::NewAuthz => "newAuthz",
            Self::RevokeCert => "revokeCert",
            Self::KeyChange => "keyChange",
        }
    }
}

/// CA'nın `/directory` belgesi.
///
/// Nonce, hesap ve sipariş adresleri olmadan istemci hiçbir şey yapamaz; bu
/// yüzden bunlar ayrıştırma sırasında zorunludur. Diğerleri isteğe bağlıdır.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcmeDirectory {
    pub new_nonce: Url,
    pub new_account: Url,
    pub new_order: Url,
    #[serde(default)]
    pub new_authz: Option<Url>,
    #[serde(default)]
    pub revoke_cert: Option<Url>,
    #[serde(default)]
    pub key_change: Option<Url>,
    #[serde(default)]
    pub meta: Option<AcmeDirectoryMeta>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcmeDirectoryMeta {
    #[serde(default)]
    pub terms_of_service: Option<Url>,
    #[serde(default)]
    pub website: Option<Url>,
    #[serde(default)]
    pub caa_identities: Vec<String>,
    #[serde(default)]
    pub external_account_required: bool,
}

impl AcmeDirectory {
    /// # Errors
    ///
    /// Zorunlu adreslerden biri eksikse ya da URL değilse
    /// `AcmeDirectoryError::Json`.
    pub fn from_json_value(value: Value) -> Result<Self, AcmeDirectoryError> {
        Ok(serde_json::from_value(value)?)
    }

    /// # Errors
    ///
    /// `from_json_value` ile aynı.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, AcmeDirectoryError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    #[must_use]
    pub const fn endpoint(&self, endpoint: KnownEndpoint) -> Option<&Url> {
        match endpoint {
            KnownEndpoint::NewNonce => Some(&self.new_nonce),
            KnownEndpoint::NewAccount => Some(&self.new_account),
            KnownEndpoint::NewOrder => Some(&self.new_order),
            KnownEndpoint::NewAuthz => self.new_authz.as_ref(),
            KnownEndpoint::RevokeCert => self.revoke_cert.as_ref(),
            KnownEndpoint::KeyChange => self.key_change.as_ref(),
        }
    }

    /// # Errors
    ///
    /// CA bu girdiyi yayınlamadıysa `AcmeDirectoryError::UnknownEndpoint`.
    pub fn require(&self, endpoint: KnownEndpoint) -> Result<&Url, AcmeDirectoryError> {
        self.endpoint(endpoint)
            .ok_or(AcmeDirectoryError::UnknownEndpoint(endpoint.as_key()))
    }

    /// Hesap oluştururken kabul edilecek sözleşme adresi, varsa.
    #[must_use]
    pub fn terms_of_service(&self) -> Option<&Url> {
        self.meta.as_ref()?.terms_of_service.as_ref()
    }
}

/// CA kök adresinden directory belgesinin adresini üretir.
///
/// Sondaki `/` atılır, `/directory` eklenir.
///
/// # Errors
///
/// Sonuç URL değilse `AcmeDirectoryError::InvalidUrl`.
pub fn directory_url(base: &str) -> Result<Url, AcmeDirectoryError> {
    let base = base.trim();
    let base = base.strip_suffix('/').unwrap_or(base);
    Url::parse(&format!("{base}/directory")).map_err(|source| AcmeDirectoryError::InvalidUrl {
        field: "directoryUrl",
        source,
    })
}
