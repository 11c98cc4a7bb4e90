// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities: a mock Kubernetes API server, an in-memory store and fixtures.

use crate::kubernetes::ResourceStore;
use crate::types::{
    CertificateExport, CertificateExportSpec, CertificateImport, CertificateImportSpec, ObjectKey,
    SyncStatus,
};
use async_trait::async_trait;
use http::{Request, Response};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::api::ObjectMeta;
use kube::client::Body;
use kube::core::ErrorResponse;
use kube::Client;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tower::Service;

/// A mock HTTP service that returns predefined responses based on request paths.
#[derive(Clone)]
pub struct MockService {
    responses: Arc<Mutex<HashMap<(String, String), (u16, String)>>>,
    requests: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add a response for requests with `method` matching the exact path
    pub fn on(self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert((method.to_string(), path.to_string()), (status, body.to_string()));
        self
    }

    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.on("GET", path, status, body)
    }

    pub fn on_post(self, path: &str, status: u16, body: &str) -> Self {
        self.on("POST", path, status, body)
    }

    pub fn on_put(self, path: &str, status: u16, body: &str) -> Self {
        self.on("PUT", path, status, body)
    }

    pub fn on_patch(self, path: &str, status: u16, body: &str) -> Self {
        self.on("PATCH", path, status, body)
    }

    /// Every (method, path) received so far, in order
    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap().clone()
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "default")
    }

    fn find_response(&self, method: &str, path: &str) -> Option<(u16, String)> {
        let responses = self.responses.lock().unwrap();
        responses
            .get(&(method.to_string(), path.to_string()))
            .cloned()
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();

        self.requests
            .lock()
            .unwrap()
            .push((method.clone(), path.clone()));
        let response = self.find_response(&method, &path);

        Box::pin(async move {
            let (status, body) = response.unwrap_or_else(|| (404, status_json(404, "NotFound", "not found")));
            Ok(Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .body(Body::from(body.into_bytes()))
                .unwrap())
        })
    }
}

/// A Kubernetes `Status` failure body
pub fn status_json(code: u16, reason: &str, message: &str) -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": message,
        "reason": reason,
        "code": code
    })
    .to_string()
}

pub fn secret_json(namespace: &str, name: &str, type_: &str) -> String {
    let mut secret = tls_secret(namespace, name, "cert", "key", None);
    secret.type_ = Some(type_.to_string());
    serde_json::to_string(&secret).unwrap()
}

pub fn export_json(namespace: &str, name: &str, secret_ref: &str) -> String {
    serde_json::to_string(&export(namespace, name, secret_ref)).unwrap()
}

pub fn import_json(namespace: &str, name: &str, from_export: &str, target_secret: &str) -> String {
    serde_json::to_string(&import(namespace, name, from_export, target_secret, None)).unwrap()
}

/// A CertificateImportList body from (namespace, name, fromExport, targetSecret) tuples
pub fn import_list_json(items: &[(&str, &str, &str, &str)]) -> String {
    let items: Vec<CertificateImport> = items
        .iter()
        .map(|(namespace, name, from, target)| import(namespace, name, from, target, None))
        .collect();
    serde_json::json!({
        "apiVersion": "cert.trust.flolive.io/v1",
        "kind": "CertificateImportList",
        "metadata": { "resourceVersion": "1" },
        "items": items
    })
    .to_string()
}

pub fn export(namespace: &str, name: &str, secret_ref: &str) -> CertificateExport {
    let mut export = CertificateExport::new(
        name,
        CertificateExportSpec {
            secret_ref: secret_ref.to_string(),
            schedule: None,
        },
    );
    export.metadata.namespace = Some(namespace.to_string());
    export
}

pub fn import(
    namespace: &str,
    name: &str,
    from_export: &str,
    target_secret: &str,
    schedule: Option<&str>,
) -> CertificateImport {
    let mut import = CertificateImport::new(
        name,
        CertificateImportSpec {
            from_export: from_export.to_string(),
            target_secret: target_secret.to_string(),
            schedule: schedule.map(str::to_string),
        },
    );
    import.metadata.namespace = Some(namespace.to_string());
    import
}

pub fn tls_secret(namespace: &str, name: &str, cert: &str, key: &str, ca: Option<&str>) -> Secret {
    let mut data = BTreeMap::from([
        ("tls.crt".to_string(), ByteString(cert.as_bytes().to_vec())),
        ("tls.key".to_string(), ByteString(key.as_bytes().to_vec())),
    ]);
    if let Some(ca) = ca {
        data.insert("ca.crt".to_string(), ByteString(ca.as_bytes().to_vec()));
    }
    Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        type_: Some("kubernetes.io/tls".to_string()),
        data: Some(data),
        ..Default::default()
    }
}

pub fn opaque_secret(namespace: &str, name: &str) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        type_: Some("Opaque".to_string()),
        data: Some(BTreeMap::from([(
            "password".to_string(),
            ByteString("secret123".as_bytes().to_vec()),
        )])),
        ..Default::default()
    }
}

fn api_error(code: u16, reason: &str, message: String) -> kube::Error {
    kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message,
        reason: reason.to_string(),
        code,
    })
}

#[derive(Default)]
struct StoreState {
    exports: BTreeMap<ObjectKey, CertificateExport>,
    imports: BTreeMap<ObjectKey, CertificateImport>,
    secrets: BTreeMap<ObjectKey, Secret>,
    fail_lists: bool,
    fail_secret_writes: bool,
    fail_status: bool,
}

/// In-memory `ResourceStore` with call counters and failure injection
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
    lists: AtomicUsize,
    gets: AtomicUsize,
    writes: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_export(self, export: CertificateExport) -> Self {
        self.put_export(export);
        self
    }

    pub fn with_import(self, import: CertificateImport) -> Self {
        self.put_import(import);
        self
    }

    pub fn with_secret(self, secret: Secret) -> Self {
        self.put_secret(secret);
        self
    }

    pub fn put_export(&self, export: CertificateExport) {
        self.state.lock().unwrap().exports.insert(export.key(), export);
    }

    pub fn put_import(&self, import: CertificateImport) {
        self.state.lock().unwrap().imports.insert(import.key(), import);
    }

    pub fn put_secret(&self, secret: Secret) {
        self.state
            .lock()
            .unwrap()
            .secrets
            .insert(ObjectKey::of(&secret), secret);
    }

    pub fn secret(&self, namespace: &str, name: &str) -> Option<Secret> {
        self.state
            .lock()
            .unwrap()
            .secrets
            .get(&ObjectKey::new(namespace, name))
            .cloned()
    }

    pub fn export_status(&self, namespace: &str, name: &str) -> Option<SyncStatus> {
        self.state
            .lock()
            .unwrap()
            .exports
            .get(&ObjectKey::new(namespace, name))
            .and_then(|e| e.status.clone())
    }

    pub fn import_status(&self, namespace: &str, name: &str) -> Option<SyncStatus> {
        self.state
            .lock()
            .unwrap()
            .imports
            .get(&ObjectKey::new(namespace, name))
            .and_then(|i| i.status.clone())
    }

    pub fn fail_lists(&self, fail: bool) {
        self.state.lock().unwrap().fail_lists = fail;
    }

    pub fn fail_secret_writes(&self, fail: bool) {
        self.state.lock().unwrap().fail_secret_writes = fail;
    }

    pub fn fail_status_updates(&self, fail: bool) {
        self.state.lock().unwrap().fail_status = fail;
    }

    pub fn list_calls(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn write_calls(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResourceStore for InMemoryStore {
    async fn list_exports(&self) -> Result<Vec<CertificateExport>, kube::Error> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        if state.fail_lists {
            return Err(api_error(503, "ServiceUnavailable", "apiserver unavailable".to_string()));
        }
        Ok(state.exports.values().cloned().collect())
    }

    async fn list_imports(&self) -> Result<Vec<CertificateImport>, kube::Error> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        if state.fail_lists {
            return Err(api_error(503, "ServiceUnavailable", "apiserver unavailable".to_string()));
        }
        Ok(state.imports.values().cloned().collect())
    }

    async fn get_export(&self, key: &ObjectKey) -> Result<Option<CertificateExport>, kube::Error> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        Ok(self.state.lock().unwrap().exports.get(key).cloned())
    }

    async fn get_secret(&self, key: &ObjectKey) -> Result<Option<Secret>, kube::Error> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        Ok(self.state.lock().unwrap().secrets.get(key).cloned())
    }

    async fn create_secret(&self, key: &ObjectKey, secret: &Secret) -> Result<(), kube::Error> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        if state.fail_secret_writes {
            return Err(api_error(403, "Forbidden", format!("secrets \"{}\" is forbidden", key.name)));
        }
        if state.secrets.contains_key(key) {
            return Err(api_error(409, "AlreadyExists", format!("secrets \"{}\" already exists", key.name)));
        }
        state.secrets.insert(key.clone(), secret.clone());
        Ok(())
    }

    async fn replace_secret(&self, key: &ObjectKey, secret: &Secret) -> Result<(), kube::Error> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        if state.fail_secret_writes {
            return Err(api_error(403, "Forbidden", format!("secrets \"{}\" is forbidden", key.name)));
        }
        if !state.secrets.contains_key(key) {
            return Err(api_error(404, "NotFound", format!("secrets \"{}\" not found", key.name)));
        }
        state.secrets.insert(key.clone(), secret.clone());
        Ok(())
    }

    async fn stamp_export_status(&self, key: &ObjectKey, status: &SyncStatus) -> Result<(), kube::Error> {
        let mut state = self.state.lock().unwrap();
        if state.fail_status {
            return Err(api_error(409, "Conflict", "the object has been modified".to_string()));
        }
        let export = state
            .exports
            .get_mut(key)
            .ok_or_else(|| api_error(404, "NotFound", format!("certificateexports \"{}\" not found", key.name)))?;
        export.status = Some(status.clone());
        Ok(())
    }

    async fn stamp_import_status(&self, key: &ObjectKey, status: &SyncStatus) -> Result<(), kube::Error> {
        let mut state = self.state.lock().unwrap();
        if state.fail_status {
            return Err(api_error(409, "Conflict", "the object has been modified".to_string()));
        }
        let import = state
            .imports
            .get_mut(key)
            .ok_or_else(|| api_error(404, "NotFound", format!("certificateimports \"{}\" not found", key.name)))?;
        import.status = Some(status.clone());
        Ok(())
    }
}
