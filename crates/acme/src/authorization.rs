use std::fmt;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::debug;
use url::Url;

use crate::order::{DnsIdentifier, OrderIdentifierError};

const TOKEN_MIN_LEN: usize = 16;
const TOKEN_MAX_LEN: usize = 128;

/// Authorization belgesi kabul edilemediğinde dönen hatalar.
#[derive(Debug, Error)]
pub enum AuthorizationError {
    #[error("authorization belgesi çözümlenemedi: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error(transparent)]
    Identifier(#[from] OrderIdentifierError),
    #[error("desteklenmeyen identifier türü: {value}")]
    UnsupportedIdentifierType { value: String },
    #[error("authorization hiç challenge içermiyor")]
    MissingChallenges,
    #[error("challenge[{index}]: {source}")]
    Challenge {
        index: usize,
        #[source]
        source: ChallengeError,
    },
}

/// Tek bir challenge nesnesinin hataları.
#[derive(Debug, Error)]
pub enum ChallengeError {
    #[error("challenge çözümlenemedi: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("challenge URL'i geçersiz: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("challenge URL şeması desteklenmiyor: {scheme}")]
    UnsupportedScheme { scheme: String },
    #[error("{kind} challenge'ında token yok")]
    MissingToken { kind: String },
    #[error("challenge token'ı geçersiz: {reason}")]
    InvalidToken { reason: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorizationStatus {
    Pending,
    Valid,
    Invalid,
    Deactivated,
    Expired,
    Revoked,
}

impl AuthorizationStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Valid => "valid",
            Self::Invalid => "invalid",
            Self::Deactivated => "deactivated",
            Self::Expired => "expired",
            Self::Revoked => "revoked",
        }
    }
}

impl fmt::Display for AuthorizationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeStatus {
    Pending,
    Processing,
    Valid,
    Invalid,
}

impl ChallengeStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Valid => "valid",
            Self::Invalid => "invalid",
        }
    }
}

impl fmt::Display for ChallengeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Challenge türü. Yalnızca `http-01` çözülür, diğerleri tanınıp atlanır.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum ChallengeKind {
    Http01,
    Dns01,
    TlsAlpn01,
    Other(String),
}

impl From<String> for ChallengeKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "http-01" => Self::Http01,
            "dns-01" => Self::Dns01,
            "tls-alpn-01" => Self::TlsAlpn01,
            _ => Self::Other(value),
        }
    }
}

impl ChallengeKind {
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Http01 => "http-01",
            Self::Dns01 => "dns-01",
            Self::TlsAlpn01 => "tls-alpn-01",
            Self::Other(value) => value,
        }
    }
}

#[derive(Deserialize)]
struct WireIdentifier {
    #[serde(rename = "type")]
    kind: String,
    value: String,
}

#[derive(Deserialize)]
struct WireAuthorization {
    status: AuthorizationStatus,
    identifier: WireIdentifier,
    #[serde(default, with = "time::serde::rfc3339::option")]
    expires: Option<OffsetDateTime>,
    #[serde(default)]
    wildcard: bool,
    challenges: Vec<Value>,
}

#[derive(Deserialize)]
struct WireChallenge {
    #[serde(rename = "type")]
    kind: ChallengeKind,
    status: ChallengeStatus,
    url: String,
    #[serde(default)]
    token: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    validated: Option<OffsetDateTime>,
}

/// Tek bir alan adının kontrol kanıtı kaydı.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
    identifier: DnsIdentifier,
    status: AuthorizationStatus,
    expires: Option<OffsetDateTime>,
    wildcard: bool,
    challenges: Vec<Challenge>,
}

impl Authorization {
    /// `http-01` challenge'ları sıkı denetlenir. Diğer türler çözülebildiği
    /// kadarıyla tutulur, çözülemeyenler atlanır.
    ///
    /// # Errors
    ///
    /// Belge beklenen şekilde değilse, identifier DNS değilse veya bir
    /// `http-01` challenge'ı geçersizse `AuthorizationError`.
    pub fn from_json_value(value: Value) -> Result<Self, AuthorizationError> {
        let wire: WireAuthorization =
            serde_json::from_value(value).map_err(AuthorizationError::Malformed)?;
        if wire.identifier.kind != "dns" {
            return Err(AuthorizationError::UnsupportedIdentifierType {
                value: wire.identifier.kind,
            });
        }
        if wire.challenges.is_empty() {
            return Err(AuthorizationError::MissingChallenges);
        }
        let mut challenges = Vec::with_capacity(wire.challenges.len());
        for (index, value) in wire.challenges.iter().enumerate() {
            match Challenge::from_json_value(value) {
                Ok(challenge) => challenges.push(challenge),
                Err(source) if is_http01(value) => {
                    return Err(AuthorizationError::Challenge { index, source });
                }
                Err(err) => debug!(index, error = %err, "kullanılmayan challenge atlandı"),
            }
        }

        Ok(Self {
            identifier: DnsIdentifier::new(&wire.identifier.value)?,
            status: wire.status,
            expires: wire.expires,
            wildcard: wire.wildcard,
            challenges,
        })
    }

    #[must_use]
    pub const fn status(&self) -> AuthorizationStatus {
        self.status
    }

    #[must_use]
    pub const fn identifier(&self) -> &DnsIdentifier {
        &self.identifier
    }

    #[must_use]
    pub const fn expires(&self) -> Option<&OffsetDateTime> {
        self.expires.as_ref()
    }

    #[must_use]
    pub const fn wildcard(&self) -> bool {
        self.wildcard
    }

    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn challenges(&self) -> &[Challenge] {
        &self.challenges
    }

    /// Listedeki ilk `http-01` challenge'ı.
    #[must_use]
    pub fn http01_challenge(&self) -> Option<&Challenge> {
        self.challenges
            .iter()
            .find(|challenge| challenge.kind == ChallengeKind::Http01)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    kind: ChallengeKind,
    status: ChallengeStatus,
    url: Url,
    token: Option<String>,
    validated: Option<OffsetDateTime>,
}

impl Challenge {
    /// Challenge nesnesini çözer. Token kuralları yalnızca `http-01` için
    /// uygulanır; diğer türlerin token'ı olduğu gibi saklanır.
    ///
    /// # Errors
    ///
    /// Alanlar eksikse, URL `http`/`https` değilse veya `http-01` token'ı
    /// kurallara uymuyorsa `ChallengeError`.
    pub fn from_json_value(value: &Value) -> Result<Self, ChallengeError> {
        let wire = WireChallenge::deserialize(value).map_err(ChallengeError::Malformed)?;
        let url = Url::parse(&wire.url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ChallengeError::UnsupportedScheme {
                scheme: url.scheme().to_owned(),
            });
        }
        if wire.kind == ChallengeKind::Http01 {
            let token = wire.token.as_deref().ok_or_else(|| ChallengeError::MissingToken {
                kind: wire.kind.as_str().to_owned(),
            })?;
            validate_token(token)?;
        }
        Ok(Self {
            kind: wire.kind,
            status: wire.status,
            url,
            token: wire.token,
            validated: wire.validated,
        })
    }

    #[must_use]
    pub const fn kind(&self) -> &ChallengeKind {
        &self.kind
    }

    #[must_use]
    pub const fn status(&self) -> ChallengeStatus {
        self.status
    }

    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    #[must_use]
    pub const fn validated(&self) -> Option<&OffsetDateTime> {
        self.validated.as_ref()
    }
}

fn is_http01(value: &Value) -> bool {
    value.get("type").and_then(Value::as_str) == Some("http-01")
}

/// Token base64url alfabesinde ve makul uzunlukta olmalı; dosya yoluna
/// girdiği için `.` ve `/` kabul edilmez.
pub(crate) fn validate_token(token: &str) -> Result<(), ChallengeError> {
    let reason = if token.len() < TOKEN_MIN_LEN {
        "token çok kısa"
    } else if token.len() > TOKEN_MAX_LEN {
        "token çok uzun"
    } else if !token
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    {
        "token base64url dışı karakter içeriyor"
    } else {
        return Ok(());
    };
    Err(ChallengeError::InvalidToken { reason })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use time::macros::datetime;

    use super::*;

    const TOKEN: &str = "evaGxfADs6pSRb2LAv9IZf17Dt3juxGJ-PCt92wr-oA";

    fn http_challenge(url: &str) -> Value {
        json!({"type": "http-01", "status": "pending", "url": url, "token": TOKEN})
    }

    #[test]
    fn picks_http01_among_offered_challenges() {
        let authorization = Authorization::from_json_value(json!({
            "status": "pending",
            "expires": "2031-03-01T00:00:00Z",
            "identifier": {"type": "dns", "value": "Example.COM."},
            "challenges": [
                {"type": "dns-01", "status": "pending", "url": "https://ca.test/c/dns", "token": TOKEN},
                http_challenge("https://ca.test/c/http"),
            ]
        }))
        .unwrap();

        assert_eq!(authorization.status(), AuthorizationStatus::Pending);
        assert_eq!(authorization.identifier().as_str(), "example.com");
        assert_eq!(authorization.expires(), Some(&datetime!(2031-03-01 00:00:00 UTC)));
        assert!(!authorization.wildcard());
        assert_eq!(authorization.challenges().len(), 2);

        let chosen = authorization.http01_challenge().unwrap();
        assert_eq!(chosen.url().as_str(), "https://ca.test/c/http");
        assert_eq!(chosen.token(), Some(TOKEN));
        assert_eq!(chosen.status(), ChallengeStatus::Pending);
    }

    #[test]
    fn no_http01_means_no_selection() {
        let authorization = Authorization::from_json_value(json!({
            "status": "pending",
            "identifier": {"type": "dns", "value": "example.com"},
            "challenges": [
                {"type": "tls-alpn-01", "status": "pending", "url": "https://ca.test/c/1", "token": TOKEN}
            ]
        }))
        .unwrap();
        assert!(authorization.http01_challenge().is_none());
    }

    #[test]
    fn rejects_non_dns_identifiers_and_empty_lists() {
        let err = Authorization::from_json_value(json!({
            "status": "pending",
            "identifier": {"type": "ip", "value": "192.0.2.1"},
            "challenges": [http_challenge("https://ca.test/c/1")]
        }))
        .unwrap_err();
        assert!(matches!(err, AuthorizationError::UnsupportedIdentifierType { value } if value == "ip"));

        let err = Authorization::from_json_value(json!({
            "status": "pending",
            "identifier": {"type": "dns", "value": "example.com"},
            "challenges": []
        }))
        .unwrap_err();
        assert!(matches!(err, AuthorizationError::MissingChallenges));

        let err = Authorization::from_json_value(json!({
            "status": "mystery",
            "identifier": {"type": "dns", "value": "example.com"},
            "challenges": [http_challenge("https://ca.test/c/1")]
        }))
        .unwrap_err();
        assert!(matches!(err, AuthorizationError::Malformed(_)));
    }

    #[test]
    fn challenge_errors_carry_their_index() {
        let err = Authorization::from_json_value(json!({
            "status": "pending",
            "identifier": {"type": "dns", "value": "example.com"},
            "challenges": [
                http_challenge("https://ca.test/c/1"),
                {"type": "http-01", "status": "pending", "url": "https://ca.test/c/2", "token": "../../etc/passwd"}
            ]
        }))
        .unwrap_err();
        match err {
            AuthorizationError::Challenge { index, source } => {
                assert_eq!(index, 1);
                assert!(matches!(source, ChallengeError::InvalidToken { .. }));
            }
            other => panic!("beklenmeyen hata: {other:?}"),
        }
    }

    #[test]
    fn malformed_foreign_challenges_do_not_block_http01() {
        let authorization = Authorization::from_json_value(json!({
            "status": "pending",
            "identifier": {"type": "dns", "value": "example.com"},
            "challenges": [
                http_challenge("https://ca.test/c/http"),
                {"type": "dns-01", "status": "pending", "url": "https://ca.test/c/dns", "token": "short"},
                {"type": "tls-alpn-01", "status": "pending", "url": "nereye"},
                {"type": "tls-alpn-01", "status": "belirsiz"}
            ]
        }))
        .unwrap();

        let kinds: Vec<&str> = authorization
            .challenges()
            .iter()
            .map(|challenge| challenge.kind().as_str())
            .collect();
        assert_eq!(kinds, vec!["http-01", "dns-01"]);
        assert_eq!(authorization.challenges()[1].token(), Some("short"));
        assert_eq!(
            authorization.http01_challenge().unwrap().url().as_str(),
            "https://ca.test/c/http"
        );
    }

    #[test]
    fn plain_http_ca_is_accepted_other_schemes_are_not() {
        let local = Challenge::from_json_value(&http_challenge("http://localhost:4001/chall/1"))
            .unwrap();
        assert_eq!(local.url().as_str(), "http://localhost:4001/chall/1");

        let err = Challenge::from_json_value(&http_challenge("ftp://ca.test/c/1")).unwrap_err();
        assert!(matches!(err, ChallengeError::UnsupportedScheme { scheme } if scheme == "ftp"));
    }

    #[test]
    fn only_http01_needs_a_token() {
        let err = Challenge::from_json_value(&json!({
            "type": "http-01", "status": "pending", "url": "https://ca.test/c/1"
        }))
        .unwrap_err();
        assert!(matches!(err, ChallengeError::MissingToken { kind } if kind == "http-01"));

        let dns = Challenge::from_json_value(&json!({
            "type": "dns-01", "status": "pending", "url": "https://ca.test/c/2"
        }))
        .unwrap();
        assert_eq!(dns.token(), None);

        let custom = Challenge::from_json_value(&json!({
            "type": "custom-01", "status": "valid", "url": "https://ca.test/c/9",
            "validated": "2031-03-01T00:05:00Z"
        }))
        .unwrap();
        assert_eq!(custom.kind(), &ChallengeKind::Other("custom-01".to_owned()));
        assert_eq!(custom.token(), None);
        assert_eq!(custom.validated(), Some(&datetime!(2031-03-01 00:05:00 UTC)));
    }

    #[test]
    fn token_length_bounds() {
        assert!(validate_token(&"a".repeat(TOKEN_MIN_LEN)).is_ok());
        assert!(validate_token(&"a".repeat(TOKEN_MIN_LEN - 1)).is_err());
        assert!(validate_token(&"a".repeat(TOKEN_MAX_LEN + 1)).is_err());
    }
}
