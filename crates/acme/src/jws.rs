use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use rand_core::{CryptoRng, OsRng, RngCore};
use rsa::errors::Error as RsaError;
use rsa::pkcs1::EncodeRsaPublicKey;
use rsa::pkcs1v15::SigningKey as RsaSigningKey;
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use signature::Error as SignatureError;
use thiserror::Error;
use url::Url;

use crate::nonce::ReplayNonce;

#[derive(Debug, Error)]
pub enum JwsError {
    #[error("kid boş olamaz")]
    EmptyKid,
    #[error("JWS içeriği JSON'a çevrilemedi: {0}")]
    SerializePayload(#[from] serde_json::Error),
    #[error("RSA anahtarı geçersiz: {0}")]
    InvalidRsaKey(#[from] RsaError),
    #[error("özel anahtar PKCS#8 PEM olarak işlenemedi: {0}")]
    PrivateKeyPem(#[from] rsa::pkcs8::Error),
    #[error("açık anahtar kodlanamadı: {0}")]
    PublicKeyEncoding(String),
    #[error("RS256 imzası üretilemedi: {0}")]
    Signature(#[from] SignatureError),
}

/// Flattened JSON gösterimli JWS; istek gövdesi olarak aynen gönderilir.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcmeJws {
    pub protected: String,
    pub payload: String,
    pub signature: String,
}

/// Korumalı başlıkta anahtarın nasıl tanıtılacağı.
///
/// Hesap URL'i bilinmeden (`newAccount`) yalnızca `Jwk` kullanılabilir;
/// sonrasında her istek `Kid(hesap_url)` taşır.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyBinding<'a> {
    Kid(&'a str),
    Jwk,
}

/// RSA açık anahtarının JWK gösterimi.
///
/// Alanlar sözlük sırasındadır; bu yüzden doğrudan serileştirmesi RFC 7638
/// kanonik biçimini verir.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RsaJwk {
    pub e: String,
    pub kty: String,
    pub n: String,
}

impl From<&RsaPublicKey> for RsaJwk {
    fn from(key: &RsaPublicKey) -> Self {
        Self {
            e: URL_SAFE_NO_PAD.encode(key.e().to_bytes_be()),
            kty: "RSA".to_owned(),
            n: URL_SAFE_NO_PAD.encode(key.n().to_bytes_be()),
        }
    }
}

/// RS256 anahtar çifti: hem hesap anahtarı hem alan adı anahtarı.
#[derive(Clone)]
pub struct RsaKeyPair {
    private_key: RsaPrivateKey,
    signing_key: RsaSigningKey<Sha256>,
}

impl fmt::Debug for RsaKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaKeyPair")
            .field("bits", &self.bits())
            .finish_non_exhaustive()
    }
}

impl RsaKeyPair {
    pub const ALGORITHM: &'static str = "RS256";
    pub const DEFAULT_MODULUS_BITS: usize = 2048;

    /// `OsRng` ile `bits` uzunluğunda anahtar üretir.
    ///
    /// # Errors
    ///
    /// Anahtar üretilemezse `JwsError::InvalidRsaKey`.
    pub fn generate(bits: usize) -> Result<Self, JwsError> {
        Self::generate_with_rng(bits, &mut OsRng)
    }

    /// # Errors
    ///
    /// Anahtar üretilemezse `JwsError::InvalidRsaKey`.
    pub fn generate_with_rng(
        bits: usize,
        rng: &mut (impl CryptoRng + RngCore),
    ) -> Result<Self, JwsError> {
        let private_key = RsaPrivateKey::new(rng, bits)?;
        Self::new(private_key)
    }

    /// # Errors
    ///
    /// Anahtar tutarlılık kontrolünden geçmezse `JwsError::InvalidRsaKey`.
    pub fn new(private_key: RsaPrivateKey) -> Result<Self, JwsError> {
        private_key.validate()?;
        Ok(Self {
            signing_key: RsaSigningKey::<Sha256>::new(private_key.clone()),
            private_key,
        })
    }

    /// PKCS#8 PEM metninden anahtar çifti yükler.
    ///
    /// # Errors
    ///
    /// PEM çözümlenemezse `JwsError::PrivateKeyPem`, anahtar geçersizse
    /// `JwsError::InvalidRsaKey` döner.
    pub fn from_pkcs8_pem(pem: &str) -> Result<Self, JwsError> {
        Self::new(RsaPrivateKey::from_pkcs8_pem(pem)?)
    }

    /// Özel anahtarı PKCS#8 PEM (`PRIVATE KEY`) olarak döndürür.
    ///
    /// # Errors
    ///
    /// Kodlama başarısız olursa `JwsError::PrivateKeyPem` döner.
    pub fn to_pkcs8_pem(&self) -> Result<String, JwsError> {
        let pem = self.private_key.to_pkcs8_pem(LineEnding::LF)?;
        Ok(pem.as_str().to_owned())
    }

    /// Açık anahtarı SPKI PEM (`PUBLIC KEY`) olarak döndürür.
    ///
    /// # Errors
    ///
    /// Kodlama başarısız olursa `JwsError::PublicKeyEncoding` döner.
    pub fn public_key_pem(&self) -> Result<String, JwsError> {
        self.public_key()
            .to_public_key_pem(LineEnding::LF)
            .map_err(|err| JwsError::PublicKeyEncoding(err.to_string()))
    }

    /// Açık anahtarı PKCS#1 `RSAPublicKey` DER olarak döndürür.
    ///
    /// # Errors
    ///
    /// Kodlama başarısız olursa `JwsError::PublicKeyEncoding` döner.
    pub fn public_key_pkcs1_der(&self) -> Result<Vec<u8>, JwsError> {
        self.public_key()
            .to_pkcs1_der()
            .map(|document| document.as_bytes().to_vec())
            .map_err(|err| JwsError::PublicKeyEncoding(err.to_string()))
    }

    #[must_use]
    pub fn public_key(&self) -> RsaPublicKey {
        self.private_key.to_public_key()
    }

    #[must_use]
    pub fn bits(&self) -> usize {
        self.private_key.size() * 8
    }

    #[must_use]
    pub fn verifying_key(&self) -> rsa::pkcs1v15::VerifyingKey<Sha256> {
        signature::Keypair::verifying_key(&self.signing_key)
    }

    #[must_use]
    pub fn jwk(&self) -> RsaJwk {
        RsaJwk::from(self.verifying_key().as_ref())
    }

    /// RFC 7638 thumbprint: kanonik JWK'nin SHA-256 özeti, base64url.
    ///
    /// # Errors
    ///
    /// JWK serileştirilemezse `JwsError::SerializePayload`.
    pub fn jwk_thumbprint(&self) -> Result<String, JwsError> {
        let canonical = serde_json::to_vec(&self.jwk())?;
        Ok(URL_SAFE_NO_PAD.encode(Sha256::digest(canonical)))
    }

    /// Ham mesajı RS256 ile imzalar.
    ///
    /// # Errors
    ///
    /// İmza üretilemezse `JwsError::Signature` döner.
    pub fn sign_raw(&self, message: &[u8]) -> Result<Vec<u8>, JwsError> {
        let signature = signature::Signer::try_sign(&self.signing_key, message)?;
        let bytes: Box<[u8]> = signature::SignatureEncoding::to_bytes(&signature);
        Ok(bytes.into_vec())
    }

    /// Boş payload POST-as-GET içindir ve `""` olarak kodlanır.
    ///
    /// # Errors
    ///
    /// `kid` boşsa veya imza üretilemezse `JwsError`.
    pub fn sign_payload(
        &self,
        payload: &[u8],
        nonce: &ReplayNonce,
        url: &Url,
        binding: KeyBinding<'_>,
    ) -> Result<AcmeJws, JwsError> {
        let header = protected_header(nonce, url, binding, || self.jwk())?;
        let protected = URL_SAFE_NO_PAD.encode(header);
        let payload = URL_SAFE_NO_PAD.encode(payload);
        let signature =
            URL_SAFE_NO_PAD.encode(self.sign_raw(format!("{protected}.{payload}").as_bytes())?);

        Ok(AcmeJws {
            protected,
            payload,
            signature,
        })
    }

    /// # Errors
    ///
    /// `sign_payload` ile aynı; ayrıca payload JSON'a çevrilemezse
    /// `JwsError::SerializePayload`.
    pub fn sign_json<T: Serialize>(
        &self,
        payload: &T,
        nonce: &ReplayNonce,
        url: &Url,
        binding: KeyBinding<'_>,
    ) -> Result<AcmeJws, JwsError> {
        self.sign_payload(&serde_json::to_vec(payload)?, nonce, url, binding)
    }
}

#[derive(Debug, Serialize)]
struct ProtectedHeader<'a> {
    alg: &'static str,
    nonce: &'a str,
    url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    kid: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    jwk: Option<RsaJwk>,
}

fn protected_header(
    nonce: &ReplayNonce,
    url: &Url,
    binding: KeyBinding<'_>,
    jwk: impl FnOnce() -> RsaJwk,
) -> Result<Vec<u8>, JwsError> {
    let mut header = ProtectedHeader {
        alg: RsaKeyPair::ALGORITHM,
        nonce: nonce.as_str(),
        url: url.as_str(),
        kid: None,
        jwk: None,
    };
    match binding {
        KeyBinding::Kid(kid) if kid.trim().is_empty() => return Err(JwsError::EmptyKid),
        KeyBinding::Kid(kid) => header.kid = Some(kid.trim()),
        KeyBinding::Jwk => header.jwk = Some(jwk()),
    }
    Ok(serde_json::to_vec(&header)?)
}
