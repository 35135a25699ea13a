//! HTTP-01 key authorization yardımcıları ve challenge yoklama takvimi.

#![allow(clippy::module_name_repetitions)]

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use thiserror::Error;

use crate::authorization::{validate_token, Challenge, ChallengeError, ChallengeKind};

/// HTTP-01 yanıtlarının servis edildiği sabit yol öneki.
pub const WELL_KNOWN_PREFIX: &str = "/.well-known/acme-challenge/";

/// SHA-256 özetinin bayt uzunluğu; thumbprint bu kadar olmalı.
const THUMBPRINT_LEN: usize = 32;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Http01ValidationError {
    #[error("challenge http-01 değil")]
    NotHttp01,
    #[error("http-01 challenge'ında token yok")]
    MissingToken,
    #[error("http-01 token'ı geçersiz: {reason}")]
    InvalidToken { reason: &'static str },
    #[error("hesap thumbprint'i boş")]
    EmptyThumbprint,
    #[error("hesap thumbprint'i geçersiz: {reason}")]
    InvalidThumbprint { reason: &'static str },
    /// Gövde birebir aynı olmalı; sondaki boşluk da fark sayılır.
    #[error("yanıt gövdesi key authorization ile eşleşmiyor: {received:?}")]
    BodyMismatch { expected: String, received: String },
}

/// Bir challenge için `<token>.<thumbprint>` değeri ve yayın yolu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Http01KeyAuthorization {
    token: String,
    thumbprint: String,
    value: String,
}

impl Http01KeyAuthorization {
    /// # Errors
    ///
    /// Token kurallara uymuyorsa ya da thumbprint 32 baytlık base64url
    /// değilse `Http01ValidationError`.
    pub fn new(token: &str, thumbprint: &str) -> Result<Self, Http01ValidationError> {
        validate_token(token).map_err(|err| match err {
            ChallengeError::InvalidToken { reason } => Http01ValidationError::InvalidToken { reason },
            _ => Http01ValidationError::InvalidToken {
                reason: "token doğrulanamadı",
            },
        })?;

        let thumbprint = thumbprint.trim();
        if thumbprint.is_empty() {
            return Err(Http01ValidationError::EmptyThumbprint);
        }
        let digest = URL_SAFE_NO_PAD.decode(thumbprint).map_err(|_| {
            Http01ValidationError::InvalidThumbprint {
                reason: "base64url değil",
            }
        })?;
        if digest.len() != THUMBPRINT_LEN {
            return Err(Http01ValidationError::InvalidThumbprint {
                reason: "SHA-256 uzunluğunda değil",
            });
        }

        Ok(Self {
            value: format!("{token}.{thumbprint}"),
            token: token.to_owned(),
            thumbprint: thumbprint.to_owned(),
        })
    }

    /// # Errors
    ///
    /// Challenge http-01 değilse veya token içermiyorsa
    /// `Http01ValidationError`; ardından `new` kuralları uygulanır.
    pub fn from_challenge(
        challenge: &Challenge,
        thumbprint: &str,
    ) -> Result<Self, Http01ValidationError> {
        if challenge.kind() != &ChallengeKind::Http01 {
            return Err(Http01ValidationError::NotHttp01);
        }
        let token = challenge.token().ok_or(Http01ValidationError::MissingToken)?;
        Self::new(token, thumbprint)
    }

    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    #[must_use]
    pub fn thumbprint(&self) -> &str {
        &self.thumbprint
    }

    #[must_use]
    pub fn resource_path(&self) -> String {
        format!("{WELL_KNOWN_PREFIX}{}", self.token)
    }

    #[must_use]
    pub fn key_authorization(&self) -> &str {
        &self.value
    }

    /// CA'nın ve yerel kontrolün sorguladığı düz HTTP adresi.
    #[must_use]
    pub fn well_known_url(&self, domain: &str) -> String {
        format!("http://{domain}{}", self.resource_path())
    }

    /// # Errors
    ///
    /// Gövde key authorization ile birebir aynı değilse
    /// `Http01ValidationError::BodyMismatch`.
    pub fn verify_body(&self, body: &str) -> Result<(), Http01ValidationError> {
        if body == self.value {
            return Ok(());
        }
        Err(Http01ValidationError::BodyMismatch {
            expected: self.value.clone(),
            received: body.to_owned(),
        })
    }
}

impl fmt::Display for Http01KeyAuthorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// Challenge doğrulama sorgularının bekleme takvimi.
///
/// `N` deneme için kalan sayaç `N`'den geriye sayar; her başarısız denemeden
/// sonra `ceil(N / kalan)` saniye beklenir. Sayaç sıfıra indiğinde takvim biter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffSchedule {
    max_attempts: u32,
    remaining: u32,
}

impl BackoffSchedule {
    #[must_use]
    pub const fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            remaining: max_attempts,
        }
    }

    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.remaining
    }
}

impl Iterator for BackoffSchedule {
    type Item = Duration;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let seconds = self.max_attempts.div_ceil(self.remaining);
        self.remaining -= 1;
        Some(Duration::from_secs(u64::from(seconds)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.remaining).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

/// Sorgular arası beklemeyi soyutlar; testler gerçek zamanı beklemez.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// `tokio::time::sleep` tabanlı varsayılan uygulama.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
