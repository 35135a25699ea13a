use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::directory::KnownEndpoint;
use crate::error::AcmeError;
use crate::http::Expect;
use crate::jws::{JwsError, RsaKeyPair};
use crate::signer::RequestSigner;
use crate::store::{Scope, StoreFormat};

/// Temel dizindeki hesap dosyasının adı.
pub const ACCOUNT_FILE: &str = "account.json";

/// ACME `newAccount` isteği.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAccountRequest {
    contact: Vec<String>,
    terms_of_service_agreed: bool,
}

impl NewAccountRequest {
    /// Şartları kabul eden ve `mailto:` iletişim bilgisi taşıyan istek.
    #[must_use]
    pub fn agreeing(username: &str) -> Self {
        let username = username.trim();
        let contact = if username.starts_with("mailto:") {
            username.to_owned()
        } else {
            format!("mailto:{username}")
        };
        Self {
            contact: vec![contact],
            terms_of_service_agreed: true,
        }
    }

    #[must_use]
    pub fn contacts(&self) -> &[String] {
        &self.contact
    }
}

/// `account.json` içeriği.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    /// PKCS#8 PEM hesap anahtarı.
    pub key: String,
    /// CA'nın `Location` başlığıyla verdiği hesap URL'i (`kid`).
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agreement: Option<String>,
}

impl fmt::Debug for AccountRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountRecord")
            .field("url", &self.url)
            .field("agreement", &self.agreement)
            .finish_non_exhaustive()
    }
}

impl AccountRecord {
    /// # Errors
    ///
    /// Dosya okunamaz veya çözümlenemezse `AcmeError::Persistence`.
    pub fn load(scope: &Scope) -> Result<Option<Self>, AcmeError> {
        if !scope.exists(ACCOUNT_FILE) {
            return Ok(None);
        }
        Ok(Some(scope.read_json(ACCOUNT_FILE)?))
    }

    /// # Errors
    ///
    /// Dosya yazılamazsa `AcmeError::Persistence`.
    pub fn save(&self, scope: &Scope) -> Result<(), AcmeError> {
        scope.write(ACCOUNT_FILE, self, StoreFormat::Json)?;
        Ok(())
    }
}

/// Başlatılmış hesap: kayıt, çözülmüş anahtar ve thumbprint.
#[derive(Debug, Clone)]
pub struct Account {
    record: AccountRecord,
    key: RsaKeyPair,
    thumbprint: String,
}

impl Account {
    /// # Errors
    ///
    /// Kayıttaki anahtar PEM olarak çözülemezse `JwsError`.
    pub fn from_record(record: AccountRecord) -> Result<Self, JwsError> {
        let key = RsaKeyPair::from_pkcs8_pem(&record.key)?;
        let thumbprint = key.jwk_thumbprint()?;
        Ok(Self {
            record,
            key,
            thumbprint,
        })
    }

    #[must_use]
    pub const fn record(&self) -> &AccountRecord {
        &self.record
    }

    #[must_use]
    pub const fn key(&self) -> &RsaKeyPair {
        &self.key
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.record.url
    }

    /// Hesap açık anahtarının RFC 7638 thumbprint değeri.
    #[must_use]
    pub fn thumbprint(&self) -> &str {
        &self.thumbprint
    }
}

/// `Link` başlık değerlerinden `rel="terms-of-service"` bağlantısını bulur.
#[must_use]
pub fn parse_terms_of_service<'a, I>(links: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    links
        .into_iter()
        .flat_map(|header| header.split(','))
        .find_map(|link| {
            let mut parts = link.split(';');
            let target = parts.next()?.trim();
            let target = target.strip_prefix('<')?.strip_suffix('>')?;
            parts
                .filter_map(|param| param.split_once('='))
                .any(|(name, value)| {
                    name.trim().eq_ignore_ascii_case("rel")
                        && value.trim().trim_matches('"') == "terms-of-service"
                })
                .then(|| target.to_owned())
        })
}

/// Kayıtlı hesabı yükler; yoksa yeni anahtar üretip CA'da hesap açar ve kaydeder.
pub(crate) async fn load_or_create(
    signer: &RequestSigner,
    scope: &Scope,
    username: &str,
    key_bits: usize,
) -> Result<Account, AcmeError> {
    if let Some(record) = AccountRecord::load(scope)? {
        debug!(url = %record.url, "kayıtlı hesap yüklendi");
        return Ok(Account::from_record(record)?);
    }

    let key = RsaKeyPair::generate(key_bits)?;
    let url = signer.directory().require(KnownEndpoint::NewAccount)?;
    debug!(url = %url, "yeni hesap oluşturuluyor");

    let payload = serde_json::to_value(NewAccountRequest::agreeing(username))
        .map_err(JwsError::from)?;
    let response = signer
        .signed_request(url, Some(&payload), &key, None, Expect::Json)
        .await?;

    let account_url = response
        .header("location")
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AcmeError::protocol("newAccount yanıtında Location başlığı yok"))?
        .to_owned();
    let agreement = parse_terms_of_service(response.header_values("link"));
    if let Some(Value::String(status)) = response.json().and_then(|body| body.get("status")) {
        if status != "valid" {
            return Err(AcmeError::protocol(format!(
                "hesap durumu geçerli değil: {status}"
            )));
        }
    }

    let record = AccountRecord {
        key: key.to_pkcs8_pem()?,
        url: account_url,
        agreement,
    };
    record.save(scope)?;
    info!(url = %record.url, "ACME hesabı oluşturuldu");

    let thumbprint = key.jwk_thumbprint()?;
    Ok(Account {
        record,
        key,
        thumbprint,
    })
}
