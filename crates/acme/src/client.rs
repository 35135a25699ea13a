//! Sertifika üretim durum makinesi.
//!
//! Bir [`AcmeClient`] tek bir temel dizine bağlıdır. `init` directory
//! belgesini keşfeder ve hesabı bir kez yükler ya da kaydeder. Ardından her
//! `generate_certificate` çağrısı tek bir etiket için sipariş, authorization,
//! challenge yayını, yerel kontrol, uzak doğrulama, finalize, indirme ve
//! kayıt adımlarını sırayla yürütür.

use std::fmt;
use std::sync::Arc;

use http::StatusCode;
use serde::Serialize;
use serde_json::{json, Value};
use time::OffsetDateTime;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};
use url::Url;

use crate::account::{self, Account, AccountRecord};
use crate::authorization::Authorization;
use crate::certificate::{
    leaf_not_after, needs_renewal, validate_chain, CertificateRecord, KeyPairPem, CERT_PEM_FILE,
};
use crate::config::ClientConfig;
use crate::csr::{build_csr_der, FinalizeRequest};
use crate::directory::{AcmeDirectory, KnownEndpoint};
use crate::error::AcmeError;
use crate::http::{AgentResponse, Expect, HttpAgent, HttpTransport, ReqwestTransport};
use crate::jws::{JwsError, RsaKeyPair};
use crate::order::{NewOrderRequest, Order, OrderStatus};
use crate::route::RouteBoard;
use crate::signer::RequestSigner;
use crate::store::Store;
use crate::validation::{BackoffSchedule, Http01KeyAuthorization, Sleeper, TokioSleeper};

/// Tek bir sertifika etiketinin geçtiği aşamalar; geri dönüş yoktur.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssuanceStage {
    OrderCreated,
    AuthorizationsFetched,
    ChallengesPublished,
    LocallyVerified,
    RemotelyValidating,
    Validated,
    Finalizing,
    CertificateIssued,
    Persisted,
}

impl IssuanceStage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OrderCreated => "order-created",
            Self::AuthorizationsFetched => "authorizations-fetched",
            Self::ChallengesPublished => "challenges-published",
            Self::LocallyVerified => "locally-verified",
            Self::RemotelyValidating => "remotely-validating",
            Self::Validated => "validated",
            Self::Finalizing => "finalizing",
            Self::CertificateIssued => "certificate-issued",
            Self::Persisted => "persisted",
        }
    }
}

impl fmt::Display for IssuanceStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct Session {
    signer: RequestSigner,
    account: Account,
}

impl Session {
    async fn post(
        &self,
        url: &Url,
        payload: Option<&Value>,
        expect: Expect,
    ) -> Result<AgentResponse, AcmeError> {
        self.signer
            .signed_request(
                url,
                payload,
                self.account.key(),
                Some(self.account.url()),
                expect,
            )
            .await
    }

    async fn post_json(&self, url: &Url, payload: Option<&Value>) -> Result<Value, AcmeError> {
        self.post(url, payload, Expect::Json).await?.into_json(url)
    }
}

struct PendingChallenge {
    domain: String,
    url: Url,
    key_authorization: Http01KeyAuthorization,
}

/// ACME HTTP-01 sertifika istemcisi.
pub struct AcmeClient {
    config: ClientConfig,
    store: Store,
    agent: HttpAgent,
    sleeper: Arc<dyn Sleeper>,
    routes: RouteBoard,
    session: OnceCell<Session>,
}

impl fmt::Debug for AcmeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AcmeClient")
            .field("base_path", &self.store.base_path())
            .field("directory_url", &self.config.directory_url)
            .field("initialized", &self.session.initialized())
            .finish_non_exhaustive()
    }
}

impl AcmeClient {
    /// `reqwest` taşımasıyla istemci oluşturur.
    ///
    /// # Errors
    ///
    /// Yapılandırma geçersizse veya HTTP istemcisi kurulamazsa
    /// `AcmeError::Configuration`.
    pub fn new(config: ClientConfig) -> Result<Self, AcmeError> {
        let transport = ReqwestTransport::new(config.source_ip, config.connect_timeout())
            .map_err(|err| AcmeError::Configuration(format!("HTTP istemcisi oluşturulamadı: {err}")))?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Verilen taşıma ile istemci oluşturur.
    ///
    /// # Errors
    ///
    /// Yapılandırma geçersizse `AcmeError::Configuration`.
    pub fn with_transport(
        config: ClientConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, AcmeError> {
        let store = config.validate()?;
        Ok(Self {
            routes: RouteBoard::new(store.clone()),
            store,
            agent: HttpAgent::new(transport),
            sleeper: Arc::new(TokioSleeper),
            session: OnceCell::new(),
            config,
        })
    }

    /// Doğrulama sorguları arasındaki beklemeyi değiştirir.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[must_use]
    pub const fn store(&self) -> &Store {
        &self.store
    }

    /// `init` tamamlandıysa hesap kaydı.
    #[must_use]
    pub fn account(&self) -> Option<&AccountRecord> {
        self.session.get().map(|session| session.account.record())
    }

    /// `init` tamamlandıysa keşfedilen directory.
    #[must_use]
    pub fn directory(&self) -> Option<&AcmeDirectory> {
        self.session.get().map(|session| session.signer.directory())
    }

    /// Directory'yi alır, hesabı yükler veya oluşturur. Tekrar çağrılırsa
    /// hiçbir ağ isteği yapılmaz.
    ///
    /// # Errors
    ///
    /// Kullanıcı adı eksikse, CA'ya ulaşılamazsa veya yanıtlar hatalıysa
    /// `AcmeError`; hata `on_error` bildirimine de iletilir.
    pub async fn init(&self) -> Result<&AccountRecord, AcmeError> {
        match self.session.get_or_try_init(|| self.open_session()).await {
            Ok(session) => Ok(session.account.record()),
            Err(err) => {
                warn!(error = %err, "istemci başlatılamadı");
                self.config.notifications.error(&err);
                Err(err)
            }
        }
    }

    async fn open_session(&self) -> Result<Session, AcmeError> {
        let username = self.config.require_username()?;
        let directory_url = self.config.directory_endpoint()?;
        debug!(url = %directory_url, "directory alınıyor");
        let document = self
            .agent
            .get(&directory_url, Expect::Json)
            .await?
            .into_json(&directory_url)?;
        let directory = AcmeDirectory::from_json_value(document)?;
        let signer = RequestSigner::new(self.agent.clone(), directory);
        let account = account::load_or_create(
            &signer,
            &self.store.root(),
            username,
            self.config.key_bits,
        )
        .await?;
        self.config.notifications.init(account.record());
        Ok(Session { signer, account })
    }

    /// Etiketin sertifikasının yenilenmesi gerekiyorsa `true`.
    ///
    /// # Errors
    ///
    /// Kayıtlı `cert.pem` okunamaz veya çözümlenemezse `AcmeError`;
    /// hata `on_error` bildirimine de iletilir.
    pub fn is_expired(&self, label: &str) -> Result<bool, AcmeError> {
        self.is_expired_at(label, OffsetDateTime::now_utc())
    }

    /// `is_expired` ile aynı, verilen ana göre.
    ///
    /// # Errors
    ///
    /// Kayıtlı `cert.pem` okunamaz veya çözümlenemezse `AcmeError`.
    pub fn is_expired_at(&self, label: &str, now: OffsetDateTime) -> Result<bool, AcmeError> {
        let scope = self.store.lookup(label);
        if !scope.exists(CERT_PEM_FILE) {
            debug!(label, "sertifika yok, yeniden üretilecek");
            return Ok(true);
        }
        let not_after = scope
            .read_to_string(CERT_PEM_FILE)
            .map_err(AcmeError::from)
            .and_then(|chain| leaf_not_after(&chain).map_err(AcmeError::from));
        match not_after {
            Ok(not_after) => Ok(needs_renewal(not_after, now)),
            Err(err) => {
                self.config.notifications.error(&err);
                Err(err)
            }
        }
    }

    /// Etiket için yeni sertifika alır ve kaydeder.
    ///
    /// # Errors
    ///
    /// `init` çağrılmadıysa `AcmeError::NotInitialized`; herhangi bir adım
    /// başarısız olursa ilgili `AcmeError`. Hata yalnızca bu etiketi etkiler.
    pub async fn generate_certificate(
        &self,
        label: &str,
        domains: &[String],
    ) -> Result<CertificateRecord, AcmeError> {
        let Some(session) = self.session.get() else {
            let err = AcmeError::NotInitialized;
            self.config.notifications.error(&err);
            return Err(err);
        };

        match self.issue(session, label, domains).await {
            Ok(record) => {
                self.config.notifications.certificate_updated(&record);
                Ok(record)
            }
            Err(err) => {
                warn!(label, error = %err, "sertifika üretilemedi");
                self.config.notifications.certificate_error(label, &err);
                Err(err)
            }
        }
    }

    /// Rota dosyasını boş kayıtla değiştirir.
    ///
    /// # Errors
    ///
    /// Dosya yazılamazsa `AcmeError::Persistence`.
    pub async fn clear(&self) -> Result<(), AcmeError> {
        self.routes.clear().await?;
        Ok(())
    }

    async fn issue(
        &self,
        session: &Session,
        label: &str,
        domains: &[String],
    ) -> Result<CertificateRecord, AcmeError> {
        validate_label(label)?;
        let request = NewOrderRequest::for_dns_names(domains)?;

        let new_order = session.signer.directory().require(KnownEndpoint::NewOrder)?;
        debug!(label, url = %new_order, domains = ?domains, "order gönderiliyor");
        let response = session
            .post(new_order, Some(&to_payload(&request)?), Expect::Json)
            .await?;
        let order_url = response
            .header("location")
            .and_then(|value| Url::parse(value.trim()).ok());
        let order = Order::from_json_value(response.into_json(new_order)?)?;
        enter(label, IssuanceStage::OrderCreated);

        let mut challenges = Vec::with_capacity(order.authorizations.len());
        for url in &order.authorizations {
            challenges.push(self.select_challenge(session, url).await?);
        }
        enter(label, IssuanceStage::AuthorizationsFetched);

        let tokens: Vec<String> = challenges
            .iter()
            .map(|challenge| challenge.key_authorization.token().to_owned())
            .collect();
        self.routes
            .publish(session.account.thumbprint(), &tokens)
            .await?;
        enter(label, IssuanceStage::ChallengesPublished);

        let outcome = self
            .complete(session, label, domains, &order, order_url.as_ref(), &challenges)
            .await;
        if let Err(err) = self.routes.withdraw(&tokens).await {
            warn!(label, error = %err, "challenge token'ları rota dosyasından kaldırılamadı");
        }
        outcome
    }

    async fn select_challenge(
        &self,
        session: &Session,
        url: &Url,
    ) -> Result<PendingChallenge, AcmeError> {
        let authorization = Authorization::from_json_value(session.post_json(url, None).await?)?;
        let domain = authorization.identifier().as_str().to_owned();
        let challenge = authorization.http01_challenge().ok_or_else(|| {
            AcmeError::protocol(format!("{domain} için http-01 challenge sunulmadı"))
        })?;
        let key_authorization =
            Http01KeyAuthorization::from_challenge(challenge, session.account.thumbprint())
                .map_err(|err| AcmeError::protocol(format!("{domain}: {err}")))?;
        debug!(
            domain = %domain,
            status = %authorization.status(),
            url = %challenge.url(),
            "http-01 challenge seçildi"
        );
        Ok(PendingChallenge {
            domain,
            url: challenge.url().clone(),
            key_authorization,
        })
    }

    async fn complete(
        &self,
        session: &Session,
        label: &str,
        domains: &[String],
        order: &Order,
        order_url: Option<&Url>,
        challenges: &[PendingChallenge],
    ) -> Result<CertificateRecord, AcmeError> {
        for challenge in challenges {
            self.verify_locally(challenge).await?;
        }
        enter(label, IssuanceStage::LocallyVerified);

        enter(label, IssuanceStage::RemotelyValidating);
        for challenge in challenges {
            self.await_validation(session, label, challenge).await?;
        }
        enter(label, IssuanceStage::Validated);

        let domain_key = RsaKeyPair::generate(self.config.key_bits)?;
        let csr = build_csr_der(&domain_key, domains)?;
        let payload = to_payload(&FinalizeRequest::from_der(&csr))?;
        enter(label, IssuanceStage::Finalizing);
        let finalized =
            Order::from_json_value(session.post_json(&order.finalize, Some(&payload)).await?)?;
        let certificate_url = match finalized.certificate {
            Some(url) => url,
            None => self.await_certificate_url(session, label, order_url).await?,
        };

        debug!(label, url = %certificate_url, "sertifika indiriliyor");
        let chain = session
            .post(&certificate_url, None, Expect::Any)
            .await?
            .text();
        let blocks = validate_chain(&chain)?;
        enter(label, IssuanceStage::CertificateIssued);

        let record = CertificateRecord {
            key: label.to_owned(),
            domains: domains.to_vec(),
            keypair: KeyPairPem {
                private_key_pem: domain_key.to_pkcs8_pem()?,
                public_key_pem: domain_key.public_key_pem()?,
            },
            cert: chain,
        };
        record.persist(&self.store.scope(Some(label))?)?;
        info!(
            label,
            domains = ?record.domains,
            certificates = blocks,
            stage = %IssuanceStage::Persisted,
            "sertifika kaydedildi"
        );
        Ok(record)
    }

    async fn verify_locally(&self, challenge: &PendingChallenge) -> Result<(), AcmeError> {
        let domain = challenge.domain.as_str();
        let target = challenge.key_authorization.well_known_url(domain);
        let url = Url::parse(&target)
            .map_err(|err| AcmeError::local_validation(domain, format!("{target}: {err}")))?;
        debug!(domain, url = %url, "yerel http-01 kontrolü");
        let response = self
            .agent
            .get(&url, Expect::Any)
            .await
            .map_err(|err| AcmeError::local_validation(domain, err.to_string()))?;
        if response.status != StatusCode::OK {
            return Err(AcmeError::local_validation(
                domain,
                format!("{url} HTTP {} döndürdü", response.status.as_u16()),
            ));
        }
        challenge
            .key_authorization
            .verify_body(&response.text())
            .map_err(|err| AcmeError::local_validation(domain, err.to_string()))
    }

    async fn await_validation(
        &self,
        session: &Session,
        label: &str,
        challenge: &PendingChallenge,
    ) -> Result<(), AcmeError> {
        let payload = json!({
            "resource": "challenge",
            "keyAuthorization": challenge.key_authorization.key_authorization(),
        });
        let max_attempts = self.config.max_attempts;
        for (attempt, delay) in (1_u32..).zip(BackoffSchedule::new(max_attempts)) {
            debug!(label, url = %challenge.url, attempt, "challenge doğrulaması isteniyor");
            let body = session.post_json(&challenge.url, Some(&payload)).await?;
            let status = body.get("status").and_then(Value::as_str).unwrap_or_default();
            if status == "valid" {
                debug!(label, domain = %challenge.domain, attempt, "challenge doğrulandı");
                return Ok(());
            }
            debug!(
                label,
                attempt,
                status,
                delay_secs = delay.as_secs(),
                "challenge henüz geçerli değil"
            );
            self.sleeper.sleep(delay).await;
        }
        Err(AcmeError::ValidationTimeout {
            url: challenge.url.to_string(),
            attempts: max_attempts,
        })
    }

    /// Finalize yanıtı sertifika adresi içermiyorsa order kaynağını sorgular.
    async fn await_certificate_url(
        &self,
        session: &Session,
        label: &str,
        order_url: Option<&Url>,
    ) -> Result<Url, AcmeError> {
        let order_url = order_url.ok_or_else(|| {
            AcmeError::protocol("finalize yanıtında sertifika adresi yok ve order adresi bilinmiyor")
        })?;
        let max_attempts = self.config.max_attempts;
        for (attempt, delay) in (1_u32..).zip(BackoffSchedule::new(max_attempts)) {
            let order = Order::from_json_value(session.post_json(order_url, None).await?)?;
            if let Some(url) = order.certificate {
                return Ok(url);
            }
            if order.status == OrderStatus::Invalid {
                return Err(AcmeError::protocol(format!("order geçersiz: {order_url}")));
            }
            debug!(
                label,
                attempt,
                status = %order.status,
                delay_secs = delay.as_secs(),
                "sertifika henüz hazır değil"
            );
            self.sleeper.sleep(delay).await;
        }
        Err(AcmeError::ValidationTimeout {
            url: order_url.to_string(),
            attempts: max_attempts,
        })
    }
}

fn enter(label: &str, stage: IssuanceStage) {
    debug!(label, stage = %stage, "aşama tamamlandı");
}

/// Etiket, temel dizin altında tek bir dizin adı olmalıdır.
fn validate_label(label: &str) -> Result<(), AcmeError> {
    let invalid = label.trim().is_empty()
        || label == "."
        || label == ".."
        || label.contains(['/', '\\']);
    if invalid {
        return Err(AcmeError::Configuration(format!(
            "geçersiz sertifika etiketi: {label:?}"
        )));
    }
    Ok(())
}

fn to_payload<T: Serialize>(value: &T) -> Result<Value, AcmeError> {
    serde_json::to_value(value).map_err(|err| JwsError::from(err).into())
}
