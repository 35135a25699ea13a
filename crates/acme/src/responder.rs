use std::path::PathBuf;

use http::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use http::{Method, Response};
use tracing::{debug, info};

use crate::error::AcmeError;
use crate::route::{RouteState, ROUTE_FILE};
use crate::store::{Store, StoreFormat};
use crate::validation::WELL_KNOWN_PREFIX;

const TEXT_PLAIN_UTF8: &str = "text/plain; charset=utf-8";

/// Rota dosyasını her istekte yeniden okuyarak challenge sorgularını yanıtlar.
#[derive(Debug, Clone)]
pub struct ChallengeResponder {
    store: Store,
}

impl ChallengeResponder {
    /// Temel dizinde `route.json` yoksa `{}` olarak oluşturur.
    ///
    /// # Errors
    ///
    /// Temel dizin yoksa `AcmeError::Configuration`, dosya yazılamazsa
    /// `AcmeError::Persistence`.
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self, AcmeError> {
        let store = Store::open(base_path)?;
        let root = store.root();
        if !root.exists(ROUTE_FILE) {
            root.write(ROUTE_FILE, "{}", StoreFormat::Text)?;
            info!(path = %root.path(ROUTE_FILE).display(), "boş rota dosyası oluşturuldu");
        }
        Ok(Self { store })
    }

    #[must_use]
    pub const fn store(&self) -> &Store {
        &self.store
    }

    /// Yayınlanmış bir token için `200 text/plain` yanıtı üretir.
    ///
    /// Yöntem GET değilse, yol `/.well-known/acme-challenge/<token>` biçiminde
    /// değilse veya token rota dosyasında yoksa `None` döner; istek çağıranın
    /// kendi yedek işleyicisine bırakılır.
    #[must_use]
    pub fn respond(&self, method: &Method, path: &str) -> Option<Response<String>> {
        if method != Method::GET {
            return None;
        }
        let token = path.strip_prefix(WELL_KNOWN_PREFIX)?;
        if token.is_empty() {
            return None;
        }
        let state = RouteState::load(&self.store.root());
        let Some(body) = state.key_authorization(token) else {
            debug!(token, "bilinmeyen challenge token'ı");
            return None;
        };
        debug!(token, "challenge yanıtlandı");

        let length = HeaderValue::from(body.len());
        let mut response = Response::new(body);
        let headers = response.headers_mut();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN_UTF8));
        headers.insert(CONTENT_LENGTH, length);
        Some(response)
    }
}
