use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use rcgen::{CertificateParams, DistinguishedName, DnType, SignatureAlgorithm};
use serde::Serialize;
use thiserror::Error;

use crate::jws::{JwsError, RsaKeyPair};

/// CSR üretimi sırasında oluşabilecek hatalar.
#[derive(Debug, Error)]
pub enum CsrError {
    #[error("CSR için en az bir alan adı gereklidir")]
    NoDomains,
    #[error("CSR açık anahtarı kodlanamadı: {0}")]
    PublicKey(#[from] JwsError),
    #[error("CSR üretilemedi: {0}")]
    Build(#[from] rcgen::Error),
}

/// rcgen'in imzalayıcı arayüzünü alan adı anahtarına bağlar.
struct RsaCsrSigner<'a> {
    key: &'a RsaKeyPair,
    public_key_der: Vec<u8>,
}

impl<'a> RsaCsrSigner<'a> {
    fn new(key: &'a RsaKeyPair) -> Result<Self, CsrError> {
        Ok(Self {
            key,
            public_key_der: key.public_key_pkcs1_der()?,
        })
    }
}

impl rcgen::PublicKeyData for RsaCsrSigner<'_> {
    fn der_bytes(&self) -> &[u8] {
        &self.public_key_der
    }

    fn algorithm(&self) -> &'static SignatureAlgorithm {
        &rcgen::PKCS_RSA_SHA256
    }
}

impl rcgen::SigningKey for RsaCsrSigner<'_> {
    fn sign(&self, msg: &[u8]) -> Result<Vec<u8>, rcgen::Error> {
        self.key
            .sign_raw(msg)
            .map_err(|_| rcgen::Error::RemoteKeyError)
    }
}

/// Alan adları için DER kodlu CSR üretir. İlk alan adı `CN` olur, hepsi SAN'a yazılır.
///
/// # Errors
///
/// Alan adı listesi boşsa veya rcgen isteği kodlayamazsa `CsrError`.
pub fn build_csr_der(key: &RsaKeyPair, domains: &[String]) -> Result<Vec<u8>, CsrError> {
    let common_name = domains.first().ok_or(CsrError::NoDomains)?;
    let mut params = CertificateParams::new(domains.to_vec())?;
    let mut subject = DistinguishedName::new();
    subject.push(DnType::CommonName, common_name.as_str());
    params.distinguished_name = subject;

    let signer = RsaCsrSigner::new(key)?;
    let request = params.serialize_request(&signer)?;
    Ok(request.der().to_vec())
}

/// `finalize` isteğinin gövdesi: base64url (padding'siz) DER CSR.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinalizeRequest {
    csr: String,
}

impl FinalizeRequest {
    #[must_use]
    pub fn from_der(der: &[u8]) -> Self {
        Self {
            csr: URL_SAFE_NO_PAD.encode(der),
        }
    }

    #[must_use]
    pub fn csr(&self) -> &str {
        &self.csr
    }
}
