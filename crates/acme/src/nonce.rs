use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use http::header::{HeaderMap, ToStrError};
use thiserror::Error;

pub const REPLAY_NONCE_HEADER: &str = "Replay-Nonce";

#[derive(Debug, Error)]
pub enum NonceError {
    #[error("CA yanıtında Replay-Nonce başlığı yok")]
    Missing,
    #[error("Replay-Nonce boş")]
    Empty,
    #[error("Replay-Nonce base64url değil: {source}")]
    InvalidBase64 {
        #[source]
        source: base64::DecodeError,
    },
    #[error("Replay-Nonce başlığı metin değil: {source}")]
    InvalidHeaderEncoding {
        #[source]
        source: ToStrError,
    },
}

/// Tek kullanımlık nonce. `Clone` değildir: her imzalı istek kendi
/// nonce'ını tüketir.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct ReplayNonce(String);

impl ReplayNonce {
    /// # Errors
    ///
    /// Değer boşsa `NonceError::Empty`, dolgusuz base64url değilse
    /// `NonceError::InvalidBase64`.
    pub fn parse<S: AsRef<str>>(value: S) -> Result<Self, NonceError> {
        let value = value.as_ref().trim();
        if value.is_empty() {
            return Err(NonceError::Empty);
        }
        match URL_SAFE_NO_PAD.decode(value) {
            Ok(_) => Ok(Self(value.to_owned())),
            Err(source) => Err(NonceError::InvalidBase64 { source }),
        }
    }

    /// Yanıt başlıklarındaki `Replay-Nonce` değerini okur.
    ///
    /// # Errors
    ///
    /// Başlık yoksa `NonceError::Missing`; değer metin değilse ya da
    /// `parse` kurallarına uymuyorsa ilgili `NonceError`.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, NonceError> {
        headers
            .get(REPLAY_NONCE_HEADER)
            .ok_or(NonceError::Missing)?
            .to_str()
            .map_err(|source| NonceError::InvalidHeaderEncoding { source })
            .and_then(Self::parse)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl FromStr for ReplayNonce {
    type Err = NonceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ReplayNonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
