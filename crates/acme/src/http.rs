use std::error::Error as StdError;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use http::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use http::{Method, StatusCode};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::error::AcmeError;
use crate::jws::AcmeJws;

const JSON_TYPE: &str = "application/json";
const PROBLEM_JSON_TYPE: &str = "application/problem+json";
const JOSE_JSON_TYPE: &str = "application/jose+json";

type BoxError = Box<dyn StdError + Send + Sync>;

/// Karşı tarafa hiç ulaşılamadığında dönen hata.
#[derive(Debug, Error)]
#[error("{url} adresine istek gönderilemedi: {source}")]
pub struct TransportError {
    url: String,
    #[source]
    source: BoxError,
}

impl TransportError {
    pub fn new(url: &Url, source: impl Into<BoxError>) -> Self {
        Self {
            url: url.to_string(),
            source: source.into(),
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Taşıma katmanına verilen tek bir HTTP isteği.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    #[must_use]
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }
}

/// Taşıma katmanının ham yanıtı.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

/// Bir isteği yürütüp durum, başlık ve gövdeyi döndüren taşıma.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// `reqwest` tabanlı üretim taşıması.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Bağlantı kurulumu için varsayılan zaman aşımı.
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    /// # Errors
    ///
    /// TLS yapılandırması yüklenemezse `reqwest::Error` döner.
    pub fn new(
        source_ip: Option<IpAddr>,
        connect_timeout: Option<Duration>,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("certsmith/", env!("CARGO_PKG_VERSION")))
            .local_address(source_ip)
            .connect_timeout(connect_timeout.unwrap_or(Self::DEFAULT_CONNECT_TIMEOUT))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let HttpRequest {
            method,
            url,
            headers,
            body,
        } = request;
        let mut builder = self
            .client
            .request(method, url.clone())
            .headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }
        let response = builder
            .send()
            .await
            .map_err(|err| TransportError::new(&url, err))?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|err| TransportError::new(&url, err))?
            .to_vec();
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Yanıt gövdesi: JSON içerik türü bildirildiyse çözümlenmiş değer, aksi halde ham bayt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseBody {
    Json(Value),
    Raw(Vec<u8>),
}

/// Agent'ın döndürdüğü yanıt.
#[derive(Debug, Clone)]
pub struct AgentResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: ResponseBody,
}

impl AgentResponse {
    /// Başlık değerini metin olarak döndürür; ad büyük/küçük harf duyarsızdır.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .and_then(|value| value.to_str().ok())
    }

    /// Aynı addaki tüm başlık değerleri.
    pub fn header_values<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .get_all(name)
            .into_iter()
            .filter_map(|value| value.to_str().ok())
    }

    #[must_use]
    pub const fn json(&self) -> Option<&Value> {
        match &self.body {
            ResponseBody::Json(value) => Some(value),
            ResponseBody::Raw(_) => None,
        }
    }

    /// JSON gövdeyi sahiplenerek döndürür.
    ///
    /// # Errors
    ///
    /// Gövde JSON değilse `AcmeError::Protocol`.
    pub fn into_json(self, url: &Url) -> Result<Value, AcmeError> {
        match self.body {
            ResponseBody::Json(value) => Ok(value),
            ResponseBody::Raw(_) => Err(AcmeError::protocol(format!(
                "Geçersiz sunucu yanıtı <{url}>, JSON verisi bekleniyordu"
            ))),
        }
    }

    /// Gövdeyi metin olarak döndürür. JSON gövdeler yeniden serileştirilir.
    #[must_use]
    pub fn text(&self) -> String {
        match &self.body {
            ResponseBody::Json(value) => value.to_string(),
            ResponseBody::Raw(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        }
    }
}

/// Yanıtın JSON olması gerekip gerekmediği.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    Json,
    Any,
}

/// ACME isteklerini taşımaya aktaran agent.
#[derive(Clone)]
pub struct HttpAgent {
    transport: Arc<dyn HttpTransport>,
}

impl fmt::Debug for HttpAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpAgent").finish_non_exhaustive()
    }
}

impl HttpAgent {
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    /// # Errors
    ///
    /// Taşıma hatası veya beklenen JSON gelmediğinde `AcmeError` döner.
    pub async fn get(&self, url: &Url, expect: Expect) -> Result<AgentResponse, AcmeError> {
        self.send(HttpRequest::new(Method::GET, url.clone()), expect)
            .await
    }

    /// # Errors
    ///
    /// Taşıma hatasında `AcmeError::Transport` döner.
    pub async fn head(&self, url: &Url) -> Result<AgentResponse, AcmeError> {
        self.send(HttpRequest::new(Method::HEAD, url.clone()), Expect::Any)
            .await
    }

    /// İmzalı JWS gövdesini `application/jose+json` olarak gönderir.
    ///
    /// # Errors
    ///
    /// Taşıma hatası veya beklenen JSON gelmediğinde `AcmeError` döner.
    pub async fn post_jose(
        &self,
        url: &Url,
        jws: &AcmeJws,
        expect: Expect,
    ) -> Result<AgentResponse, AcmeError> {
        let body = serde_json::to_vec(jws).map_err(crate::jws::JwsError::from)?;
        let mut request = HttpRequest::new(Method::POST, url.clone());
        request
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(JOSE_JSON_TYPE));
        request.body = Some(body);
        self.send(request, expect).await
    }

    async fn send(&self, request: HttpRequest, expect: Expect) -> Result<AgentResponse, AcmeError> {
        let url = request.url.clone();
        debug!(method = %request.method, url = %url, "http isteği");
        let response = self.transport.execute(request).await?;
        decode_response(&url, response, expect)
    }
}

fn content_type(headers: &HeaderMap) -> String {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn is_json_type(content_type: &str) -> bool {
    content_type
        .strip_prefix(JSON_TYPE)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(';'))
}

fn decode_response(
    url: &Url,
    response: HttpResponse,
    expect: Expect,
) -> Result<AgentResponse, AcmeError> {
    let HttpResponse {
        status,
        headers,
        body,
    } = response;
    let content_type = content_type(&headers);

    let body = if is_json_type(&content_type) {
        let value = serde_json::from_slice(&body).map_err(|err| {
            AcmeError::protocol(format!("{url} yanıtı JSON olarak çözümlenemedi: {err}"))
        })?;
        ResponseBody::Json(value)
    } else {
        if expect == Expect::Json {
            return Err(AcmeError::protocol(json_expectation_message(
                url,
                &content_type,
                &body,
            )));
        }
        ResponseBody::Raw(body)
    };

    Ok(AgentResponse {
        status,
        headers,
        body,
    })
}

fn json_expectation_message(url: &Url, content_type: &str, body: &[u8]) -> String {
    if content_type.starts_with(PROBLEM_JSON_TYPE) {
        let detail = serde_json::from_slice::<Value>(body)
            .ok()
            .and_then(|problem| problem.get("detail").and_then(Value::as_str).map(str::to_owned))
            .filter(|detail| !detail.is_empty());
        if let Some(detail) = detail {
            return detail;
        }
    }
    format!("Geçersiz sunucu yanıtı <{url}>, JSON verisi bekleniyordu")
}
