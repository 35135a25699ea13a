use std::fmt;

use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde::{Deserialize, Serialize as DeriveSerialize};
use thiserror::Error;
use url::Url;

/// DNS identifier doğrulama hataları.
#[derive(Debug, Error)]
pub enum OrderIdentifierError {
    /// DNS identifier değeri boş bırakıldı.
    #[error("ACME DNS identifier değeri boş olamaz")]
    EmptyDns,
    /// DNS identifier değeri geçersiz karakter içeriyor veya hatalı biçimde.
    #[error("ACME DNS identifier değeri geçersiz: {value}")]
    InvalidDns { value: String },
    /// Wildcard sertifikalar desteklenmiyor.
    #[error("wildcard identifier desteklenmiyor: {value}")]
    Wildcard { value: String },
}

/// Order isteği ve yanıtı ile ilgili hatalar.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Hiç alan adı verilmedi.
    #[error("ACME newOrder isteği en az bir identifier içermelidir")]
    MissingIdentifier,
    #[error(transparent)]
    Identifier(#[from] OrderIdentifierError),
    /// CA'nın order yanıtı beklenen şemaya uymuyor.
    #[error("ACME order yanıtı çözümlenemedi: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Küçük harfe çevrilmiş, sondaki noktası atılmış DNS identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DnsIdentifier(String);

impl DnsIdentifier {
    /// DNS identifier oluşturur ve doğrular.
    ///
    /// # Errors
    ///
    /// DNS değeri boşsa, wildcard içeriyorsa veya geçersiz karakter
    /// içeriyorsa `OrderIdentifierError` döndürülür.
    pub fn new(value: &str) -> Result<Self, OrderIdentifierError> {
        let trimmed = value.trim();
        let without_trailing_dot = trimmed.trim_end_matches('.');
        if without_trailing_dot.is_empty() {
            return Err(OrderIdentifierError::EmptyDns);
        }

        let normalized = without_trailing_dot.to_ascii_lowercase();
        let invalid = || OrderIdentifierError::InvalidDns {
            value: trimmed.to_owned(),
        };
        if normalized.len() > 253 {
            return Err(invalid());
        }

        for label in normalized.split('.') {
            if label == "*" {
                return Err(OrderIdentifierError::Wildcard {
                    value: trimmed.to_owned(),
                });
            }
            if label.is_empty()
                || label.len() > 63
                || label.starts_with('-')
                || label.ends_with('-')
                || label
                    .chars()
                    .any(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_')))
            {
                return Err(invalid());
            }
        }

        Ok(Self(normalized))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DnsIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for DnsIdentifier {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("DnsIdentifier", 2)?;
        state.serialize_field("type", "dns")?;
        state.serialize_field("value", &self.0)?;
        state.end()
    }
}

/// ACME `newOrder` isteği.
#[derive(Debug, Clone, PartialEq, Eq, DeriveSerialize)]
pub struct NewOrderRequest {
    identifiers: Vec<DnsIdentifier>,
}

impl NewOrderRequest {
    /// DNS isimleri için order isteği üretir.
    ///
    /// # Errors
    ///
    /// Herhangi bir domain geçersizse veya liste boşsa `OrderError`
    /// döndürülür.
    pub fn for_dns_names<I, S>(names: I) -> Result<Self, OrderError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let identifiers = names
            .into_iter()
            .map(|name| DnsIdentifier::new(name.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        if identifiers.is_empty() {
            return Err(OrderError::MissingIdentifier);
        }
        Ok(Self { identifiers })
    }

    #[must_use]
    pub fn identifiers(&self) -> &[DnsIdentifier] {
        &self.identifiers
    }
}

/// ACME order durumları.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Ready,
    Processing,
    Valid,
    Invalid,
}

impl OrderStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Ready => "ready",
            Self::Processing => "processing",
            Self::Valid => "valid",
            Self::Invalid => "invalid",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CA'nın döndürdüğü order kaynağı.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub status: OrderStatus,
    #[serde(default)]
    pub authorizations: Vec<Url>,
    pub finalize: Url,
    #[serde(default)]
    pub certificate: Option<Url>,
}

impl Order {
    /// # Errors
    ///
    /// Zorunlu alanlar eksikse veya URL'ler geçersizse `OrderError::Malformed`.
    pub fn from_json_value(value: serde_json::Value) -> Result<Self, OrderError> {
        serde_json::from_value(value).map_err(OrderError::from)
    }
}
