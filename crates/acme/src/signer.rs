use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::directory::{AcmeDirectory, KnownEndpoint};
use crate::error::AcmeError;
use crate::http::{AgentResponse, Expect, HttpAgent};
use crate::jws::{KeyBinding, RsaKeyPair};
use crate::nonce::ReplayNonce;

/// Directory'ye bağlı imzalı istek gönderici.
#[derive(Debug, Clone)]
pub struct RequestSigner {
    agent: HttpAgent,
    directory: AcmeDirectory,
}

impl RequestSigner {
    #[must_use]
    pub const fn new(agent: HttpAgent, directory: AcmeDirectory) -> Self {
        Self { agent, directory }
    }

    #[must_use]
    pub const fn directory(&self) -> &AcmeDirectory {
        &self.directory
    }

    #[must_use]
    pub const fn agent(&self) -> &HttpAgent {
        &self.agent
    }

    /// `newNonce` uç noktasına `HEAD` gönderip tek kullanımlık nonce alır.
    ///
    /// # Errors
    ///
    /// Yanıtta `Replay-Nonce` yoksa veya geçersizse `AcmeError::Protocol`.
    pub async fn nonce(&self) -> Result<ReplayNonce, AcmeError> {
        let url = self.directory.require(KnownEndpoint::NewNonce)?;
        let response = self.agent.head(url).await?;
        ReplayNonce::from_headers(&response.headers).map_err(|err| {
            debug!(url = %url, error = %err, "nonce alınamadı");
            AcmeError::from(err)
        })
    }

    /// İmzalı istek gönderir. `kid` yoksa başlıkta açık anahtar (`jwk`) kullanılır.
    ///
    /// `payload` `None` ise gövde boş string olarak imzalanır (POST-as-GET).
    ///
    /// # Errors
    ///
    /// Nonce alınamazsa, imza üretilemezse veya yanıt beklentiyi
    /// karşılamazsa `AcmeError` döner.
    pub async fn signed_request(
        &self,
        url: &Url,
        payload: Option<&Value>,
        key: &RsaKeyPair,
        kid: Option<&str>,
        expect: Expect,
    ) -> Result<AgentResponse, AcmeError> {
        let nonce = self.nonce().await?;
        let binding = kid.map_or(KeyBinding::Jwk, KeyBinding::Kid);
        let jws = match payload {
            Some(payload) => key.sign_json(payload, &nonce, url, binding)?,
            None => key.sign_payload(b"", &nonce, url, binding)?,
        };
        self.agent.post_jose(url, &jws, expect).await
    }
}
