//! Shared utilities for integration tests.
//!
//! [`MockApiServer`] answers the two pod endpoints the way the API server
//! does and records every request it receives. It serves plain HTTP, or
//! HTTPS with a certificate from a throwaway [`TestPki`].

#![allow(dead_code)]

use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use rcgen::{
    BasicConstraints, Certificate, CertificateParams, DnType, IsCa, KeyPair, KeyUsagePurpose,
};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use serde_json::Value;
use tokio::net::TcpListener;

use kube_service_registration::kubernetes::{ClusterConnection, HttpPodClient, InClusterSettings};

pub const TEST_NAMESPACE: &str = "default";
pub const TEST_POD: &str = "shell-demo";
/// Answers every request with a 500.
pub const BROKEN_POD: &str = "broken";
/// Answers every request with a 200 whose body is not JSON.
pub const GARBLED_POD: &str = "garbled";

pub const BROKEN_BODY: &str = "etcdserver: request timed out";

const GET_POD_RESPONSE: &str = include_str!("../fixtures/get-pod-response.json");
const UPDATE_POD_TAGS_RESPONSE: &str = include_str!("../fixtures/update-pod-tags-response.json");
const NOT_FOUND_RESPONSE: &str = include_str!("../fixtures/not-found-response.json");

/// One request as seen by the mock server.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The request body parsed as a JSON Patch document.
    pub fn patch_ops(&self) -> Vec<Value> {
        match serde_json::from_str(&self.body).unwrap() {
            Value::Array(ops) => ops,
            other => panic!("patch body is not an array: {}", other),
        }
    }
}

type Requests = Arc<Mutex<Vec<RecordedRequest>>>;

#[derive(Clone)]
pub struct MockApiServer {
    pub addr: SocketAddr,
    requests: Requests,
}

impl MockApiServer {
    /// Bind to an ephemeral port and start serving.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests: Requests = Arc::default();

        let app = router(requests.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, requests }
    }

    /// Like [`MockApiServer::start`], but over TLS with the server
    /// certificate issued by `pki`.
    pub async fn start_tls(pki: &TestPki) -> Self {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let addr = listener.local_addr().unwrap();
        let requests: Requests = Arc::default();

        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let mut server_config = rustls::ServerConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .unwrap()
            .with_no_client_auth()
            .with_single_cert(
                vec![pki.server_cert.clone()],
                PrivateKeyDer::Pkcs8(pki.server_key.clone_key()),
            )
            .unwrap();
        server_config.alpn_protocols = vec![b"http/1.1".to_vec()];
        let tls = RustlsConfig::from_config(Arc::new(server_config));

        let app = router(requests.clone());
        tokio::spawn(async move {
            let _ = axum_server::from_tcp_rustls(listener, tls)
                .serve(app.into_make_service())
                .await;
        });

        Self { addr, requests }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn patches(&self) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == Method::PATCH)
            .collect()
    }

    /// Build a client pointed at this server over plain HTTP.
    ///
    /// `env_prefix` must be unique per test, since the host and port are
    /// passed through environment variables.
    pub fn client(&self, env_prefix: &str) -> HttpPodClient {
        client_for(self.addr, env_prefix)
    }

    /// Build an HTTPS client that trusts only the CA in `ca_pem`.
    pub fn tls_client(&self, env_prefix: &str, ca_pem: &str) -> HttpPodClient {
        let mut ca_file = tempfile::NamedTempFile::new().unwrap();
        ca_file.write_all(ca_pem.as_bytes()).unwrap();
        connect(self.addr, env_prefix, "https://", ca_file.path().to_path_buf())
    }
}

pub fn client_for(addr: SocketAddr, env_prefix: &str) -> HttpPodClient {
    connect(addr, env_prefix, "http://", fixture("ca.crt"))
}

fn connect(addr: SocketAddr, env_prefix: &str, scheme: &str, ca_file: PathBuf) -> HttpPodClient {
    let settings = InClusterSettings {
        host_env: format!("{}_SERVICE_HOST", env_prefix),
        port_env: format!("{}_SERVICE_PORT", env_prefix),
        token_file: fixture("token"),
        ca_file,
        scheme: scheme.to_string(),
    };
    std::env::set_var(&settings.host_env, addr.ip().to_string());
    std::env::set_var(&settings.port_env, addr.port().to_string());

    let connection = ClusterConnection::load(&settings).unwrap();
    HttpPodClient::new(connection).unwrap()
}

/// A freshly generated CA and a server certificate for 127.0.0.1 signed
/// by it.
pub struct TestPki {
    pub ca_pem: String,
    pub server_cert: CertificateDer<'static>,
    pub server_key: PrivatePkcs8KeyDer<'static>,
}

impl TestPki {
    pub fn generate() -> Self {
        let (ca, ca_key) = certificate_authority();

        let server_key = KeyPair::generate().unwrap();
        let server_cert = CertificateParams::new(vec!["127.0.0.1".to_string()])
            .unwrap()
            .signed_by(&server_key, &ca, &ca_key)
            .unwrap();

        Self {
            ca_pem: ca.pem(),
            server_cert: server_cert.der().clone(),
            server_key: PrivatePkcs8KeyDer::from(server_key.serialize_der()),
        }
    }
}

fn certificate_authority() -> (Certificate, KeyPair) {
    let key = KeyPair::generate().unwrap();
    let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params
        .distinguished_name
        .push(DnType::CommonName, "kube-service-registration test CA");
    params.key_usages = vec![
        KeyUsagePurpose::KeyCertSign,
        KeyUsagePurpose::CrlSign,
        KeyUsagePurpose::DigitalSignature,
    ];
    let cert = params.self_signed(&key).unwrap();
    (cert, key)
}

fn router(requests: Requests) -> Router {
    Router::new().fallback(handle).with_state(requests)
}

pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

pub fn fixture_token() -> String {
    std::fs::read_to_string(fixture("token"))
        .unwrap()
        .trim_end()
        .to_string()
}

async fn handle(
    State(requests): State<Requests>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, String) {
    requests.lock().unwrap().push(RecordedRequest {
        method: method.clone(),
        path: uri.path().to_string(),
        headers,
        body,
    });

    let Some((namespace, pod_name)) = parse_path(uri.path()) else {
        return (
            StatusCode::BAD_REQUEST,
            format!("unable to parse {}", uri.path()),
        );
    };

    match (namespace, pod_name) {
        (TEST_NAMESPACE, BROKEN_POD) => {
            (StatusCode::INTERNAL_SERVER_ERROR, BROKEN_BODY.to_string())
        }
        (TEST_NAMESPACE, GARBLED_POD) => (StatusCode::OK, "<html>not json</html>".to_string()),
        (TEST_NAMESPACE, TEST_POD) if method == Method::GET => {
            (StatusCode::OK, GET_POD_RESPONSE.to_string())
        }
        (TEST_NAMESPACE, TEST_POD) if method == Method::PATCH => {
            (StatusCode::OK, UPDATE_POD_TAGS_RESPONSE.to_string())
        }
        (TEST_NAMESPACE, TEST_POD) => (
            StatusCode::BAD_REQUEST,
            format!("unexpected request method: {}", method),
        ),
        _ => (StatusCode::NOT_FOUND, NOT_FOUND_RESPONSE.to_string()),
    }
}

/// Split `/api/v1/namespaces/{namespace}/pods/{pod}`.
fn parse_path(path: &str) -> Option<(&str, &str)> {
    let rest = path.strip_prefix("/api/v1/namespaces/")?;
    let (namespace, pod_name) = rest.split_once("/pods/")?;
    if namespace.is_empty() || pod_name.is_empty() || pod_name.contains('/') {
        return None;
    }
    Some((namespace, pod_name))
}
