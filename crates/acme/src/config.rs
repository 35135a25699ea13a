use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::directory::directory_url;
use crate::error::AcmeError;
use crate::notify::Notifications;
use crate::store::Store;

/// Let's Encrypt üretim ortamı.
pub const DEFAULT_DIRECTORY_URL: &str = "https://acme-v02.api.letsencrypt.org";
/// Let's Encrypt test ortamı.
pub const STAGING_DIRECTORY_URL: &str = "https://acme-staging-v02.api.letsencrypt.org";
pub const DEFAULT_KEY_BITS: usize = 2048;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 15;
/// Kabul edilen en küçük RSA modül uzunluğu.
pub const MIN_KEY_BITS: usize = 1024;

/// İstemci yapılandırması. JSON anahtarları camelCase'dir.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Hesap iletişim adresi; hesap oluşturmak için zorunludur.
    #[serde(default)]
    pub username: Option<String>,
    /// Var olması gereken depolama dizini.
    pub base_path: PathBuf,
    #[serde(default = "default_key_bits")]
    pub key_bits: usize,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// CA kök adresi; `/directory` otomatik eklenir.
    #[serde(default = "default_directory_url")]
    pub directory_url: String,
    #[serde(default)]
    pub source_ip: Option<IpAddr>,
    /// Bağlantı zaman aşımı (saniye).
    #[serde(default)]
    pub connection_timeout: Option<u64>,
    #[serde(skip)]
    pub notifications: Notifications,
}

fn default_key_bits() -> usize {
    DEFAULT_KEY_BITS
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_directory_url() -> String {
    DEFAULT_DIRECTORY_URL.to_owned()
}

impl ClientConfig {
    /// Varsayılanlarla yapılandırma oluşturur.
    #[must_use]
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            username: None,
            base_path: base_path.into(),
            key_bits: DEFAULT_KEY_BITS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            directory_url: default_directory_url(),
            source_ip: None,
            connection_timeout: None,
            notifications: Notifications::default(),
        }
    }

    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    #[must_use]
    pub fn with_directory_url(mut self, url: impl Into<String>) -> Self {
        self.directory_url = url.into();
        self
    }

    #[must_use]
    pub const fn with_key_bits(mut self, bits: usize) -> Self {
        self.key_bits = bits;
        self
    }

    #[must_use]
    pub const fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    #[must_use]
    pub fn with_notifications(mut self, notifications: Notifications) -> Self {
        self.notifications = notifications;
        self
    }

    /// Yapılandırmayı bir kez doğrular ve depoyu açar.
    ///
    /// # Errors
    ///
    /// Temel dizin yoksa, anahtar boyu ya da deneme sayısı aralık dışındaysa
    /// veya directory adresi geçersizse `AcmeError::Configuration`.
    pub fn validate(&self) -> Result<Store, AcmeError> {
        let store = Store::open(&self.base_path)?;
        if self.key_bits < MIN_KEY_BITS {
            return Err(AcmeError::Configuration(format!(
                "keyBits en az {MIN_KEY_BITS} olmalı, verilen {}",
                self.key_bits
            )));
        }
        if self.max_attempts == 0 {
            return Err(AcmeError::Configuration(
                "maxAttempts en az 1 olmalı".to_owned(),
            ));
        }
        self.directory_endpoint()?;
        Ok(store)
    }

    /// `directoryUrl` değerinden directory belgesinin tam adresi.
    ///
    /// # Errors
    ///
    /// Adres ayrıştırılamazsa `AcmeError::Configuration`.
    pub fn directory_endpoint(&self) -> Result<Url, AcmeError> {
        directory_url(&self.directory_url).map_err(|err| AcmeError::Configuration(err.to_string()))
    }

    /// Boş olmayan kullanıcı adı.
    ///
    /// # Errors
    ///
    /// Kullanıcı adı verilmemişse `AcmeError::Configuration`.
    pub fn require_username(&self) -> Result<&str, AcmeError> {
        self.username
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| AcmeError::Configuration("kullanıcı adı (username) tanımlı değil".to_owned()))
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connection_timeout.map(Duration::from_secs)
    }
}
