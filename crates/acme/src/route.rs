//! Üretim süreci ile HTTP-01 dinleyicisi arasındaki ortak `route.json` kaydı.

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::store::{Scope, Store, StoreError, StoreFormat};

/// Temel dizindeki rota dosyasının adı.
pub const ROUTE_FILE: &str = "route.json";

/// Dinleyicinin yanıtlaması gereken token kümesi ve hesap parmak izi.
///
/// Boş durum `{}` olarak serileştirilir.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tokens: Vec<String>,
}

impl RouteState {
    #[must_use]
    pub fn new(fingerprint: impl Into<String>, tokens: Vec<String>) -> Self {
        Self {
            fingerprint: Some(fingerprint.into()),
            tokens,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Token yayınlanmışsa `<token>.<fingerprint>` değerini döndürür.
    #[must_use]
    pub fn key_authorization(&self, token: &str) -> Option<String> {
        let fingerprint = self.fingerprint.as_deref()?;
        self.tokens
            .iter()
            .any(|candidate| candidate == token)
            .then(|| format!("{token}.{fingerprint}"))
    }

    /// Rota dosyasını okur. Dosya yoksa veya bozuksa boş durum döner.
    #[must_use]
    pub fn load(scope: &Scope) -> Self {
        if !scope.exists(ROUTE_FILE) {
            return Self::default();
        }
        match scope.read_json(ROUTE_FILE) {
            Ok(state) => state,
            Err(err) => {
                warn!(error = %err, "rota dosyası okunamadı, boş kabul ediliyor");
                Self::default()
            }
        }
    }
}

/// Rota dosyasının oku-değiştir-yaz döngülerini süreç içinde sıraya koyar.
///
/// Aynı hesapla eşzamanlı verilen siparişler yalnızca kendi token'larını ekler
/// ve kaldırır; parmak izi tüm siparişler için aynıdır.
#[derive(Debug)]
pub struct RouteBoard {
    store: Store,
    lock: Mutex<()>,
}

impl RouteBoard {
    #[must_use]
    pub fn new(store: Store) -> Self {
        Self {
            store,
            lock: Mutex::new(()),
        }
    }

    /// Token'ları mevcut kümeye ekler. Farklı bir parmak izi bulunursa küme
    /// baştan kurulur.
    ///
    /// # Errors
    ///
    /// Rota dosyası yazılamazsa `StoreError` döner.
    pub async fn publish(&self, fingerprint: &str, tokens: &[String]) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let scope = self.store.root();
        let mut state = RouteState::load(&scope);
        if state.fingerprint.as_deref() != Some(fingerprint) {
            state = RouteState::new(fingerprint, Vec::new());
        }
        for token in tokens {
            if !state.tokens.contains(token) {
                state.tokens.push(token.clone());
            }
        }
        debug!(tokens = state.tokens.len(), "rota dosyası güncellendi");
        scope.write(ROUTE_FILE, &state, StoreFormat::Json)
    }

    /// Yalnızca verilen token'ları kümeden çıkarır; küme boşalırsa `{}` yazar.
    ///
    /// # Errors
    ///
    /// Rota dosyası yazılamazsa `StoreError` döner.
    pub async fn withdraw(&self, tokens: &[String]) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let scope = self.store.root();
        let mut state = RouteState::load(&scope);
        state.tokens.retain(|token| !tokens.contains(token));
        if state.tokens.is_empty() {
            state = RouteState::default();
        }
        scope.write(ROUTE_FILE, &state, StoreFormat::Json)
    }

    /// Rota dosyasını koşulsuz olarak `{}` ile değiştirir.
    ///
    /// # Errors
    ///
    /// Rota dosyası yazılamazsa `StoreError` döner.
    pub async fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        self.store
            .root()
            .write(ROUTE_FILE, "{}", StoreFormat::Text)
    }
}
