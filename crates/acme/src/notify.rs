use std::fmt;
use std::sync::Arc;

use crate::account::AccountRecord;
use crate::certificate::CertificateRecord;
use crate::error::AcmeError;

type InitHook = Arc<dyn Fn(&AccountRecord) + Send + Sync>;
type ErrorHook = Arc<dyn Fn(&AcmeError) + Send + Sync>;
type CertificateErrorHook = Arc<dyn Fn(&str, &AcmeError) + Send + Sync>;
type CertificateUpdatedHook = Arc<dyn Fn(&CertificateRecord) + Send + Sync>;

/// Dört isteğe bağlı bildirim yuvası. Boş yuvalar sessizce atlanır.
///
/// Yuvalar ilgili adımdan sonra eşzamanlı çağrılır; hata yine çağırana döner.
#[derive(Clone, Default)]
pub struct Notifications {
    on_init: Option<InitHook>,
    on_error: Option<ErrorHook>,
    on_certificate_error: Option<CertificateErrorHook>,
    on_certificate_updated: Option<CertificateUpdatedHook>,
}

impl Notifications {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hesap yüklendikten veya oluşturulduktan sonra.
    #[must_use]
    pub fn on_init(mut self, hook: impl Fn(&AccountRecord) + Send + Sync + 'static) -> Self {
        self.on_init = Some(Arc::new(hook));
        self
    }

    /// `init` hataları, başlatılmamış istemci ve okunamayan sertifikalar için.
    #[must_use]
    pub fn on_error(mut self, hook: impl Fn(&AcmeError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(hook));
        self
    }

    /// Bir etiketin sertifika üretimi başarısız olduğunda.
    #[must_use]
    pub fn on_certificate_error(
        mut self,
        hook: impl Fn(&str, &AcmeError) + Send + Sync + 'static,
    ) -> Self {
        self.on_certificate_error = Some(Arc::new(hook));
        self
    }

    /// Yeni sertifika kaydı yazıldığında.
    #[must_use]
    pub fn on_certificate_updated(
        mut self,
        hook: impl Fn(&CertificateRecord) + Send + Sync + 'static,
    ) -> Self {
        self.on_certificate_updated = Some(Arc::new(hook));
        self
    }

    pub(crate) fn init(&self, record: &AccountRecord) {
        if let Some(hook) = &self.on_init {
            hook(record);
        }
    }

    pub(crate) fn error(&self, err: &AcmeError) {
        if let Some(hook) = &self.on_error {
            hook(err);
        }
    }

    pub(crate) fn certificate_error(&self, label: &str, err: &AcmeError) {
        if let Some(hook) = &self.on_certificate_error {
            hook(label, err);
        }
    }

    pub(crate) fn certificate_updated(&self, record: &CertificateRecord) {
        if let Some(hook) = &self.on_certificate_updated {
            hook(record);
        }
    }
}

impl fmt::Debug for Notifications {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifications")
            .field("on_init", &self.on_init.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_certificate_error", &self.on_certificate_error.is_some())
            .field("on_certificate_updated", &self.on_certificate_updated.is_some())
            .finish()
    }
}
