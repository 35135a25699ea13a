#![forbid(unsafe_code)]
#![deny(warnings)]
#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

//! ACME (RFC 8555) HTTP-01 sertifika istemcisi.
//!
//! [`AcmeClient`] hesabı açar ve her etiket için sipariş, doğrulama, finalize
//! ve indirme adımlarını yürütür. [`ChallengeResponder`] aynı temel dizindeki
//! `route.json` dosyasını okuyarak CA'nın HTTP-01 sorgularını yanıtlar.

mod account;
mod authorization;
mod batch;
mod certificate;
mod client;
mod config;
mod csr;
mod directory;
mod error;
mod http;
mod jws;
mod nonce;
mod notify;
mod order;
mod responder;
mod route;
mod signer;
mod store;
mod validation;

pub use account::{parse_terms_of_service, Account, AccountRecord, NewAccountRequest, ACCOUNT_FILE};
pub use authorization::{
    Authorization, AuthorizationError, AuthorizationStatus, Challenge, ChallengeError,
    ChallengeKind, ChallengeStatus,
};
pub use batch::{run_batch, BatchOutcome, BatchReport, CertificateEntry, CertificateSet};
pub use certificate::{
    leaf_not_after, needs_renewal, remaining_days, split_chain, validate_chain, CertificateError,
    CertificateRecord, KeyPairPem, CERT_CA_FILE, CERT_CRT_FILE, CERT_JSON_FILE, CERT_KEY_FILE,
    CERT_PEM_FILE, DEFAULT_RENEWAL_THRESHOLD,
};
pub use client::{AcmeClient, IssuanceStage};
pub use config::{
    ClientConfig, DEFAULT_DIRECTORY_URL, DEFAULT_KEY_BITS, DEFAULT_MAX_ATTEMPTS, MIN_KEY_BITS,
    STAGING_DIRECTORY_URL,
};
pub use csr::{build_csr_der, CsrError, FinalizeRequest};
pub use directory::{
    directory_url, AcmeDirectory, AcmeDirectoryError, AcmeDirectoryMeta, KnownEndpoint,
};
pub use error::AcmeError;
pub use self::http::{
    AgentResponse, Expect, HttpAgent, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport,
    ResponseBody, TransportError,
};
pub use jws::{AcmeJws, JwsError, KeyBinding, RsaJwk, RsaKeyPair};
pub use nonce::{NonceError, ReplayNonce, REPLAY_NONCE_HEADER};
pub use notify::Notifications;
pub use order::{
    DnsIdentifier, NewOrderRequest, Order, OrderError, OrderIdentifierError, OrderStatus,
};
pub use responder::ChallengeResponder;
pub use route::{RouteBoard, RouteState, ROUTE_FILE};
pub use signer::RequestSigner;
pub use store::{Scope, StagedWrite, Store, StoreError, StoreFormat};
pub use validation::{
    BackoffSchedule, Http01KeyAuthorization, Http01ValidationError, Sleeper, TokioSleeper,
    WELL_KNOWN_PREFIX,
};

/// `Sleeper` uygulayanlar için yeniden dışa aktarılan makro.
pub use async_trait::async_trait;
