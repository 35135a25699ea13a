#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use certsmith_acme::{
    async_trait, AcmeClient, ChallengeResponder, ClientConfig, HttpRequest, HttpResponse,
    HttpTransport, Sleeper, TransportError, REPLAY_NONCE_HEADER,
};
use http::header::{HeaderMap, HeaderValue, CONTENT_TYPE, LINK, LOCATION};
use http::{Method, StatusCode};
use rcgen::{BasicConstraints, CertificateParams, IsCa, Issuer, KeyPair};
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::signature::Verifier;
use rsa::{BigUint, RsaPublicKey};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use url::Url;
use x509_parser::certification_request::X509CertificationRequest;
use x509_parser::extensions::{GeneralName, ParsedExtension};
use x509_parser::prelude::FromDer;

pub const CA_BASE: &str = "https://acme.test";
pub const CA_HOST: &str = "acme.test";
pub const TERMS_URL: &str = "https://acme.test/terms";
pub const USERNAME: &str = "ops@example.com";

/// Bellek içi ACME CA. Yerel HTTP-01 kontrolünü aynı temel dizindeki gerçek
/// `ChallengeResponder` üzerinden yanıtlar.
pub struct MockCa {
    responder: ChallengeResponder,
    ca_params: CertificateParams,
    ca_key_pem: String,
    ca_pem: String,
    pending_polls: u32,
    processing_polls: u32,
    leaf_validity_days: i64,
    unreachable: BTreeSet<String>,
    nonce_counter: AtomicU64,
    state: Mutex<CaState>,
}

#[derive(Default)]
struct CaState {
    issued_nonces: BTreeSet<String>,
    used_nonces: BTreeSet<String>,
    accounts: HashMap<String, Value>,
    orders: HashMap<u64, OrderEntry>,
    requests: Vec<(Method, String)>,
    probes: Vec<String>,
}

struct OrderEntry {
    account: String,
    domains: Vec<String>,
    challenges: Vec<ChallengeEntry>,
    status: &'static str,
    processing_left: u32,
    chain: Option<String>,
}

struct ChallengeEntry {
    domain: String,
    token: String,
    status: &'static str,
    polls: u32,
}

struct Signed {
    path: String,
    kid: Option<String>,
    jwk: Value,
    payload: Option<Value>,
}

struct Problem {
    status: StatusCode,
    kind: &'static str,
    detail: String,
}

impl Problem {
    fn new(status: StatusCode, kind: &'static str, detail: impl Into<String>) -> Self {
        Self {
            status,
            kind,
            detail: detail.into(),
        }
    }

    fn malformed(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "malformed", detail)
    }

    fn unauthorized(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized", detail)
    }
}

type Reply = Result<HttpResponse, Problem>;

impl MockCa {
    pub fn new(base_path: &Path) -> Self {
        let ca_key = KeyPair::generate().unwrap();
        let mut ca_params = CertificateParams::new(Vec::<String>::new()).unwrap();
        ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        ca_params
            .distinguished_name
            .push(rcgen::DnType::CommonName, "certsmith test CA");
        let ca_pem = ca_params.self_signed(&ca_key).unwrap().pem();

        Self {
            responder: ChallengeResponder::new(base_path).unwrap(),
            ca_params,
            ca_key_pem: ca_key.serialize_pem(),
            ca_pem,
            pending_polls: 0,
            processing_polls: 0,
            leaf_validity_days: 90,
            unreachable: BTreeSet::new(),
            nonce_counter: AtomicU64::new(0),
            state: Mutex::default(),
        }
    }

    /// Challenge bu kadar sorgu boyunca `pending` kalır.
    #[must_use]
    pub const fn pending_polls(mut self, polls: u32) -> Self {
        self.pending_polls = polls;
        self
    }

    #[must_use]
    pub const fn never_validates(self) -> Self {
        self.pending_polls(u32::MAX)
    }

    /// Finalize sonrasında order bu kadar sorgu boyunca `processing` kalır.
    #[must_use]
    pub const fn processing_polls(mut self, polls: u32) -> Self {
        self.processing_polls = polls;
        self
    }

    #[must_use]
    pub fn unreachable(mut self, domain: &str) -> Self {
        self.unreachable.insert(domain.to_owned());
        self
    }

    pub fn requests(&self) -> Vec<(Method, String)> {
        self.state.lock().unwrap().requests.clone()
    }

    /// Yolu verilen önekle başlayan istek sayısı.
    pub fn hits(&self, method: &Method, prefix: &str) -> usize {
        self.requests()
            .iter()
            .filter(|(seen, url)| seen == method && url.starts_with(&format!("{CA_BASE}{prefix}")))
            .count()
    }

    /// Doğrulama anında route.json üzerinden başarıyla yanıtlanan token'lar.
    pub fn probes(&self) -> Vec<String> {
        self.state.lock().unwrap().probes.clone()
    }

    pub fn account_count(&self) -> usize {
        self.state.lock().unwrap().accounts.len()
    }

    fn next_nonce(&self) -> String {
        let value = self.nonce_counter.fetch_add(1, Ordering::Relaxed) + 1;
        let nonce = URL_SAFE_NO_PAD.encode(value.to_be_bytes());
        self.state
            .lock()
            .unwrap()
            .issued_nonces
            .insert(nonce.clone());
        nonce
    }

    fn response(&self, status: StatusCode, content_type: &str, body: Vec<u8>) -> HttpResponse {
        let mut headers = HeaderMap::new();
        headers.insert(REPLAY_NONCE_HEADER, self.next_nonce().parse().unwrap());
        if !content_type.is_empty() {
            headers.insert(CONTENT_TYPE, content_type.parse().unwrap());
        }
        HttpResponse {
            status,
            headers,
            body,
        }
    }

    fn json(&self, status: StatusCode, value: &Value) -> HttpResponse {
        self.response(status, "application/json", value.to_string().into_bytes())
    }

    fn problem(&self, problem: &Problem) -> HttpResponse {
        let body = json!({
            "type": format!("urn:ietf:params:acme:error:{}", problem.kind),
            "detail": problem.detail,
            "status": problem.status.as_u16(),
        });
        self.response(
            problem.status,
            "application/problem+json",
            body.to_string().into_bytes(),
        )
    }

    fn directory(&self) -> HttpResponse {
        self.json(
            StatusCode::OK,
            &json!({
                "newNonce": format!("{CA_BASE}/acme/new-nonce"),
                "newAccount": format!("{CA_BASE}/acme/new-acct"),
                "newOrder": format!("{CA_BASE}/acme/new-order"),
                "revokeCert": format!("{CA_BASE}/acme/revoke-cert"),
                "keyChange": format!("{CA_BASE}/acme/key-change"),
                "meta": {"termsOfService": TERMS_URL}
            }),
        )
    }

    fn probe(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let host = request.url.host_str().unwrap_or_default();
        if self.unreachable.contains(host) {
            return Err(TransportError::new(&request.url, "bağlantı reddedildi"));
        }
        let path = request.url.path();
        match self.responder.respond(&request.method, path) {
            Some(response) => {
                let (parts, body) = response.into_parts();
                Ok(HttpResponse {
                    status: parts.status,
                    headers: parts.headers,
                    body: body.into_bytes(),
                })
            }
            None => Ok(HttpResponse {
                status: StatusCode::NOT_FOUND,
                headers: HeaderMap::new(),
                body: format!("Cannot {} {path}", request.method).into_bytes(),
            }),
        }
    }

    fn verify(&self, request: &HttpRequest) -> Result<Signed, Problem> {
        let body: Value = request
            .body
            .as_deref()
            .and_then(|bytes| serde_json::from_slice(bytes).ok())
            .ok_or_else(|| Problem::malformed("JWS gövdesi yok"))?;
        let part = |name: &str| {
            body.get(name)
                .and_then(Value::as_str)
                .map(str::to_owned)
                .ok_or_else(|| Problem::malformed(format!("JWS {name} alanı yok")))
        };
        let (protected, payload, signature) =
            (part("protected")?, part("payload")?, part("signature")?);

        let header: Value = URL_SAFE_NO_PAD
            .decode(&protected)
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .ok_or_else(|| Problem::malformed("protected başlık çözümlenemedi"))?;
        if header["alg"] != "RS256" {
            return Err(Problem::new(
                StatusCode::BAD_REQUEST,
                "badSignatureAlgorithm",
                "yalnızca RS256",
            ));
        }
        if header["url"].as_str() != Some(request.url.as_str()) {
            return Err(Problem::unauthorized("JWS url başlığı istek adresiyle eşleşmiyor"));
        }

        let nonce = header["nonce"].as_str().unwrap_or_default().to_owned();
        let mut state = self.state.lock().unwrap();
        if !state.issued_nonces.contains(&nonce) || !state.used_nonces.insert(nonce) {
            return Err(Problem::new(
                StatusCode::BAD_REQUEST,
                "badNonce",
                "nonce geçersiz veya kullanılmış",
            ));
        }

        let kid = header["kid"].as_str().map(str::to_owned);
        let jwk = match (&kid, header.get("jwk")) {
            (Some(kid), None) => state
                .accounts
                .get(kid)
                .cloned()
                .ok_or_else(|| Problem::new(StatusCode::BAD_REQUEST, "accountDoesNotExist", kid.clone()))?,
            (None, Some(jwk)) => jwk.clone(),
            _ => return Err(Problem::malformed("kid ve jwk birlikte ya da hiç verilmedi")),
        };
        drop(state);

        verify_signature(&jwk, format!("{protected}.{payload}").as_bytes(), &signature)?;
        let payload = if payload.is_empty() {
            None
        } else {
            Some(
                URL_SAFE_NO_PAD
                    .decode(&payload)
                    .ok()
                    .and_then(|bytes| serde_json::from_slice(&bytes).ok())
                    .ok_or_else(|| Problem::malformed("payload JSON değil"))?,
            )
        };
        Ok(Signed {
            path: request.url.path().to_owned(),
            kid,
            jwk,
            payload,
        })
    }

    fn post(&self, signed: Signed) -> Reply {
        let path = signed.path.clone();
        if path == "/acme/new-acct" {
            return self.new_account(&signed);
        }
        let account = signed
            .kid
            .clone()
            .ok_or_else(|| Problem::malformed("hesap isteği dışında kid zorunlu"))?;
        if path == "/acme/new-order" {
            return self.new_order(&account, signed.payload.as_ref());
        }
        if let Some(rest) = path.strip_prefix("/acme/authz/") {
            let (order, index) = parse_pair(rest)?;
            return self.authorization(order, index);
        }
        if let Some(rest) = path.strip_prefix("/acme/chall/") {
            let (order, index) = parse_pair(rest)?;
            return self.challenge(order, index, &signed);
        }
        if let Some(rest) = path.strip_prefix("/acme/cert/") {
            return self.certificate(parse_id(rest)?);
        }
        if let Some(rest) = path.strip_prefix("/acme/order/") {
            return match rest.strip_suffix("/finalize") {
                Some(id) => self.finalize(parse_id(id)?, signed.payload.as_ref()),
                None => self.order(parse_id(rest)?),
            };
        }
        Err(Problem::new(StatusCode::NOT_FOUND, "malformed", format!("bilinmeyen yol {path}")))
    }

    fn new_account(&self, signed: &Signed) -> Reply {
        if signed.kid.is_some() {
            return Err(Problem::malformed("newAccount jwk ile imzalanmalı"));
        }
        let payload = signed.payload.clone().unwrap_or_default();
        if payload["termsOfServiceAgreed"] != true {
            return Err(Problem::new(
                StatusCode::FORBIDDEN,
                "userActionRequired",
                "kullanım koşulları kabul edilmeli",
            ));
        }
        let mut state = self.state.lock().unwrap();
        let url = format!("{CA_BASE}/acme/acct/{}", state.accounts.len() + 1);
        state.accounts.insert(url.clone(), signed.jwk.clone());
        drop(state);

        let mut response = self.json(
            StatusCode::CREATED,
            &json!({"status": "valid", "contact": payload["contact"]}),
        );
        response.headers.insert(LOCATION, url.parse().unwrap());
        response.headers.append(
            LINK,
            HeaderValue::from_static("<https://acme.test/acme/directory>;rel=\"index\""),
        );
        response.headers.append(
            LINK,
            format!("<{TERMS_URL}>;rel=\"terms-of-service\"").parse().unwrap(),
        );
        Ok(response)
    }

    fn new_order(&self, account: &str, payload: Option<&Value>) -> Reply {
        let domains: Vec<String> = payload
            .and_then(|payload| payload["identifiers"].as_array())
            .ok_or_else(|| Problem::malformed("identifiers yok"))?
            .iter()
            .filter(|identifier| identifier["type"] == "dns")
            .filter_map(|identifier| identifier["value"].as_str().map(str::to_owned))
            .collect();
        if domains.is_empty() {
            return Err(Problem::new(StatusCode::BAD_REQUEST, "rejectedIdentifier", "boş order"));
        }

        let mut state = self.state.lock().unwrap();
        let id = state.orders.len() as u64 + 1;
        let challenges = domains
            .iter()
            .enumerate()
            .map(|(index, domain)| ChallengeEntry {
                domain: domain.clone(),
                token: format!("token-{id:06}-{index:06}"),
                status: "pending",
                polls: 0,
            })
            .collect();
        let entry = OrderEntry {
            account: account.to_owned(),
            domains,
            challenges,
            status: "pending",
            processing_left: self.processing_polls,
            chain: None,
        };
        let body = order_body(id, &entry);
        state.orders.insert(id, entry);
        drop(state);

        let mut response = self.json(StatusCode::CREATED, &body);
        response
            .headers
            .insert(LOCATION, format!("{CA_BASE}/acme/order/{id}").parse().unwrap());
        Ok(response)
    }

    fn authorization(&self, order: u64, index: usize) -> Reply {
        let state = self.state.lock().unwrap();
        let challenge = state
            .orders
            .get(&order)
            .and_then(|entry| entry.challenges.get(index))
            .ok_or_else(|| Problem::new(StatusCode::NOT_FOUND, "malformed", "authorization yok"))?;
        let body = json!({
            "status": if challenge.status == "valid" { "valid" } else { "pending" },
            "expires": "2099-01-01T00:00:00Z",
            "identifier": {"type": "dns", "value": challenge.domain},
            "challenges": [
                {
                    "type": "dns-01",
                    "url": format!("{CA_BASE}/acme/chall-dns/{order}/{index}"),
                    "token": format!("dns-token-{order:06}-{index:06}"),
                    "status": "pending"
                },
                {
                    "type": "http-01",
                    "url": format!("{CA_BASE}/acme/chall/{order}/{index}"),
                    "token": challenge.token,
                    "status": challenge.status
                }
            ]
        });
        drop(state);
        Ok(self.json(StatusCode::OK, &body))
    }

    fn challenge(&self, order: u64, index: usize, signed: &Signed) -> Reply {
        let thumbprint = thumbprint(&signed.jwk);
        let mut state = self.state.lock().unwrap();
        let CaState { orders, probes, .. } = &mut *state;
        let entry = orders
            .get_mut(&order)
            .ok_or_else(|| Problem::new(StatusCode::NOT_FOUND, "malformed", "order yok"))?;
        let challenge = entry
            .challenges
            .get_mut(index)
            .ok_or_else(|| Problem::new(StatusCode::NOT_FOUND, "malformed", "challenge yok"))?;

        let expected = format!("{}.{thumbprint}", challenge.token);
        let offered = signed
            .payload
            .as_ref()
            .and_then(|payload| payload["keyAuthorization"].as_str());
        if offered != Some(expected.as_str()) {
            return Err(Problem::new(
                StatusCode::FORBIDDEN,
                "unauthorized",
                "keyAuthorization eşleşmiyor",
            ));
        }

        if challenge.status == "pending" {
            if challenge.polls < self.pending_polls {
                challenge.polls += 1;
            } else {
                let path = format!("/.well-known/acme-challenge/{}", challenge.token);
                let answered = self
                    .responder
                    .respond(&Method::GET, &path)
                    .is_some_and(|response| response.body() == &expected);
                if answered {
                    probes.push(challenge.token.clone());
                    challenge.status = "valid";
                } else {
                    challenge.status = "invalid";
                }
            }
        }
        let body = json!({
            "type": "http-01",
            "url": format!("{CA_BASE}/acme/chall/{order}/{index}"),
            "token": challenge.token,
            "status": challenge.status,
        });
        if entry.challenges.iter().all(|challenge| challenge.status == "valid") {
            entry.status = "ready";
        }
        drop(state);
        Ok(self.json(StatusCode::OK, &body))
    }

    fn finalize(&self, id: u64, payload: Option<&Value>) -> Reply {
        let csr = payload
            .and_then(|payload| payload["csr"].as_str())
            .and_then(|csr| URL_SAFE_NO_PAD.decode(csr).ok())
            .ok_or_else(|| Problem::new(StatusCode::BAD_REQUEST, "badCSR", "csr çözümlenemedi"))?;
        let requested = csr_dns_names(&csr)?;

        let mut state = self.state.lock().unwrap();
        let entry = state
            .orders
            .get_mut(&id)
            .ok_or_else(|| Problem::new(StatusCode::NOT_FOUND, "malformed", "order yok"))?;
        if entry.status != "ready" {
            return Err(Problem::new(
                StatusCode::FORBIDDEN,
                "orderNotReady",
                format!("order durumu {}", entry.status),
            ));
        }
        if requested != entry.domains {
            return Err(Problem::new(
                StatusCode::BAD_REQUEST,
                "badCSR",
                "CSR alan adları order ile eşleşmiyor",
            ));
        }
        entry.chain = Some(self.issue_chain(&entry.domains));
        entry.status = if entry.processing_left > 0 {
            "processing"
        } else {
            "valid"
        };
        let body = order_body(id, entry);
        drop(state);
        Ok(self.json(StatusCode::OK, &body))
    }

    fn order(&self, id: u64) -> Reply {
        let mut state = self.state.lock().unwrap();
        let entry = state
            .orders
            .get_mut(&id)
            .ok_or_else(|| Problem::new(StatusCode::NOT_FOUND, "malformed", "order yok"))?;
        if entry.status == "processing" {
            entry.processing_left = entry.processing_left.saturating_sub(1);
            if entry.processing_left == 0 {
                entry.status = "valid";
            }
        }
        let body = order_body(id, entry);
        drop(state);
        Ok(self.json(StatusCode::OK, &body))
    }

    fn certificate(&self, id: u64) -> Reply {
        let state = self.state.lock().unwrap();
        let chain = state
            .orders
            .get(&id)
            .filter(|entry| entry.status == "valid")
            .and_then(|entry| entry.chain.clone())
            .ok_or_else(|| Problem::new(StatusCode::NOT_FOUND, "malformed", "sertifika yok"))?;
        drop(state);
        Ok(self.response(
            StatusCode::OK,
            "application/pem-certificate-chain",
            chain.into_bytes(),
        ))
    }

    fn issue_chain(&self, domains: &[String]) -> String {
        let issuer = Issuer::new(
            self.ca_params.clone(),
            KeyPair::from_pem(&self.ca_key_pem).unwrap(),
        );
        let now = OffsetDateTime::now_utc();
        let mut params = CertificateParams::new(domains.to_vec()).unwrap();
        params.not_before = now - time::Duration::days(1);
        params.not_after = now + time::Duration::days(self.leaf_validity_days);
        let leaf = params
            .signed_by(&KeyPair::generate().unwrap(), &issuer)
            .unwrap();
        format!("{}{}", leaf.pem(), self.ca_pem)
    }
}

#[async_trait]
impl HttpTransport for MockCa {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.state
            .lock()
            .unwrap()
            .requests
            .push((request.method.clone(), request.url.to_string()));

        if request.url.scheme() == "http" {
            return self.probe(&request);
        }
        if request.url.host_str() != Some(CA_HOST) {
            return Err(TransportError::new(&request.url, "bilinmeyen sunucu"));
        }

        let reply = match (request.method.clone(), request.url.path()) {
            (Method::GET, "/directory") => Ok(self.directory()),
            (Method::HEAD, "/acme/new-nonce") => Ok(self.response(StatusCode::OK, "", Vec::new())),
            (Method::POST, _) => self.verify(&request).and_then(|signed| self.post(signed)),
            _ => Err(Problem::new(StatusCode::METHOD_NOT_ALLOWED, "malformed", "desteklenmiyor")),
        };
        Ok(reply.unwrap_or_else(|problem| self.problem(&problem)))
    }
}

fn order_body(id: u64, entry: &OrderEntry) -> Value {
    let mut body = json!({
        "status": entry.status,
        "identifiers": entry
            .domains
            .iter()
            .map(|domain| json!({"type": "dns", "value": domain}))
            .collect::<Vec<_>>(),
        "authorizations": (0..entry.challenges.len())
            .map(|index| format!("{CA_BASE}/acme/authz/{id}/{index}"))
            .collect::<Vec<_>>(),
        "finalize": format!("{CA_BASE}/acme/order/{id}/finalize"),
    });
    if entry.status == "valid" {
        body["certificate"] = json!(format!("{CA_BASE}/acme/cert/{id}"));
    }
    body
}

fn parse_id(value: &str) -> Result<u64, Problem> {
    value
        .parse()
        .map_err(|_| Problem::new(StatusCode::NOT_FOUND, "malformed", format!("geçersiz kimlik {value}")))
}

fn parse_pair(value: &str) -> Result<(u64, usize), Problem> {
    let (order, index) = value
        .split_once('/')
        .ok_or_else(|| Problem::malformed(format!("geçersiz yol {value}")))?;
    let index = index
        .parse()
        .map_err(|_| Problem::malformed(format!("geçersiz sıra {index}")))?;
    Ok((parse_id(order)?, index))
}

fn thumbprint(jwk: &Value) -> String {
    let canonical = format!(
        r#"{{"e":"{}","kty":"RSA","n":"{}"}}"#,
        jwk["e"].as_str().unwrap_or_default(),
        jwk["n"].as_str().unwrap_or_default()
    );
    URL_SAFE_NO_PAD.encode(Sha256::digest(canonical.as_bytes()))
}

fn verify_signature(jwk: &Value, input: &[u8], signature: &str) -> Result<(), Problem> {
    let component = |name: &str| {
        jwk[name]
            .as_str()
            .and_then(|value| URL_SAFE_NO_PAD.decode(value).ok())
            .map(|bytes| BigUint::from_bytes_be(&bytes))
            .ok_or_else(|| Problem::malformed(format!("jwk {name} çözümlenemedi")))
    };
    let bad_signature = || Problem::unauthorized("JWS imzası doğrulanamadı");
    let key = RsaPublicKey::new(component("n")?, component("e")?).map_err(|_| bad_signature())?;
    let signature = URL_SAFE_NO_PAD
        .decode(signature)
        .ok()
        .and_then(|bytes| Signature::try_from(bytes.as_slice()).ok())
        .ok_or_else(bad_signature)?;
    VerifyingKey::<Sha256>::new(key)
        .verify(input, &signature)
        .map_err(|_| bad_signature())
}

fn csr_dns_names(der: &[u8]) -> Result<Vec<String>, Problem> {
    let bad_csr = || Problem::new(StatusCode::BAD_REQUEST, "badCSR", "CSR ayrıştırılamadı");
    let (_, request) = X509CertificationRequest::from_der(der).map_err(|_| bad_csr())?;
    Ok(request
        .requested_extensions()
        .into_iter()
        .flatten()
        .filter_map(|extension| match extension {
            ParsedExtension::SubjectAlternativeName(san) => Some(san),
            _ => None,
        })
        .flat_map(|san| san.general_names.iter())
        .filter_map(|name| match name {
            GeneralName::DNSName(dns) => Some((*dns).to_owned()),
            _ => None,
        })
        .collect())
}

/// İstenen beklemeleri kaydeder, gerçekten beklemez.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}

pub fn secs(values: &[u64]) -> Vec<Duration> {
    values.iter().copied().map(Duration::from_secs).collect()
}

pub fn config(base_path: &Path) -> ClientConfig {
    ClientConfig::new(base_path)
        .with_username(USERNAME)
        .with_directory_url(CA_BASE)
        .with_key_bits(1024)
        .with_max_attempts(3)
}

pub fn client(config: ClientConfig, ca: &Arc<MockCa>, sleeper: &Arc<RecordingSleeper>) -> AcmeClient {
    AcmeClient::with_transport(config, ca.clone())
        .unwrap()
        .with_sleeper(sleeper.clone())
}

pub fn domains(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_owned()).collect()
}

/// Verilen bitiş tarihiyle kendinden imzalı bir sertifika PEM'i.
pub fn certificate_pem(domain: &str, not_after: OffsetDateTime) -> String {
    let mut params = CertificateParams::new(vec![domain.to_owned()]).unwrap();
    params.not_before = not_after - time::Duration::days(90);
    params.not_after = not_after;
    params.self_signed(&KeyPair::generate().unwrap()).unwrap().pem()
}

pub fn url(path: &str) -> Url {
    Url::parse(&format!("{CA_BASE}{path}")).unwrap()
}
