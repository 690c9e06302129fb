//! Minimal Kubernetes API client for `PipelineActivity` resources.
//!
//! Talks plain HTTP(S) to the API server (or to `kubectl proxy`) with
//! `ureq`: a long-lived `?watch=true` GET for events and a full-object PUT
//! for updates.

use std::io::{BufRead, BufReader, Lines, Read};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use rustls::{ClientConfig, RootCertStore};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::activity::PipelineActivity;
use crate::error::{Result, SpotwatchError};
use crate::watch::{ActivityStore, WatchEvent, WatchSource};

const ACTIVITY_PATH: &str = "apis/jenkins.io/v1";
const ACTIVITY_RESOURCE: &str = "pipelineactivities";

/// Path of the service-account token inside a pod.
pub const IN_CLUSTER_TOKEN_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

/// Path of the cluster CA bundle inside a pod.
pub const IN_CLUSTER_CA_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/ca.crt";

pub struct KubeClient {
    api_server: String,
    namespace: String,
    token: Option<String>,
    timeout: Duration,
    /// Used for updates; bounded by a timeout.
    agent: ureq::Agent,
    /// Used for the watch stream, which stays open indefinitely.
    watch_agent: ureq::Agent,
}

impl KubeClient {
    pub fn new(api_server: &str, namespace: &str, timeout: Duration) -> Self {
        Self {
            api_server: api_server.trim_end_matches('/').to_string(),
            namespace: namespace.to_string(),
            token: None,
            timeout,
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            watch_agent: ureq::AgentBuilder::new().build(),
        }
    }

    /// Trust only the CA certificates in `ca_pem` when talking to the API
    /// server, as an in-cluster client must.
    pub fn with_ca_pem(mut self, ca_pem: &[u8]) -> Result<Self> {
        let tls = Arc::new(cluster_tls_config(ca_pem)?);
        self.agent = ureq::AgentBuilder::new()
            .timeout(self.timeout)
            .tls_config(tls.clone())
            .build();
        self.watch_agent = ureq::AgentBuilder::new().tls_config(tls).build();
        Ok(self)
    }

    /// Read a PEM CA bundle from `path`, if the file exists.
    pub fn read_ca(path: &Path) -> Result<Option<Vec<u8>>> {
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(std::fs::read(path)?))
    }

    #[must_use]
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
        self
    }

    /// Read a bearer token from `path`, if the file exists.
    pub fn read_token(path: &Path) -> Result<Option<String>> {
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(std::fs::read_to_string(path)?))
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn collection_url(&self, namespace: &str) -> String {
        format!(
            "{}/{}/namespaces/{}/{}",
            self.api_server, ACTIVITY_PATH, namespace, ACTIVITY_RESOURCE
        )
    }

    fn authorize(&self, request: ureq::Request) -> ureq::Request {
        let request = request.set("Accept", "application/json");
        match &self.token {
            Some(token) => request.set("Authorization", &format!("Bearer {}", token)),
            None => request,
        }
    }
}

impl ActivityStore for KubeClient {
    fn update(&self, activity: &PipelineActivity) -> Result<PipelineActivity> {
        let namespace = activity.namespace().unwrap_or(&self.namespace);
        let url = format!("{}/{}", self.collection_url(namespace), activity.name());
        let body = serde_json::to_value(activity)?;

        let request = self.authorize(self.agent.put(&url));
        match request.send_json(body) {
            Ok(response) => Ok(response.into_json::<PipelineActivity>()?),
            Err(ureq::Error::Status(409, response)) => Err(SpotwatchError::Conflict {
                name: activity.name().to_string(),
                message: response.into_string().unwrap_or_default(),
            }),
            Err(ureq::Error::Status(code, response)) => {
                let body = response.into_string().unwrap_or_default();
                Err(SpotwatchError::Store(format!(
                    "updating PipelineActivity {} failed (HTTP {}): {}",
                    activity.name(),
                    code,
                    body
                )))
            }
            Err(e) => Err(SpotwatchError::Transport {
                url,
                message: e.to_string(),
            }),
        }
    }
}

impl WatchSource for KubeClient {
    fn watch(&self) -> Result<Box<dyn Iterator<Item = Result<WatchEvent>> + '_>> {
        let url = self.collection_url(&self.namespace);
        debug!(%url, "opening watch");
        let request = self.authorize(self.watch_agent.get(&url)).query("watch", "true");
        let response = match request.call() {
            Ok(response) => response,
            Err(ureq::Error::Status(code, response)) => {
                return Err(SpotwatchError::Status {
                    url,
                    code,
                    reason: response.status_text().to_string(),
                });
            }
            Err(e) => {
                return Err(SpotwatchError::Transport {
                    url,
                    message: e.to_string(),
                });
            }
        };
        Ok(Box::new(WatchStream::new(response.into_reader())))
    }
}

/// TLS settings whose root store holds exactly the certificates in `ca_pem`.
fn cluster_tls_config(ca_pem: &[u8]) -> Result<ClientConfig> {
    let mut roots = RootCertStore::empty();
    for cert in rustls_pemfile::certs(&mut &*ca_pem) {
        roots.add(cert?)?;
    }
    if roots.is_empty() {
        return Err(SpotwatchError::Tls(
            "CA bundle contains no certificates".to_string(),
        ));
    }

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .with_root_certificates(roots)
        .with_no_client_auth();
    Ok(config)
}

#[derive(Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    object: Value,
}

/// Newline-delimited JSON watch events read lazily from a response body.
pub struct WatchStream<R> {
    lines: Lines<BufReader<R>>,
}

impl<R: Read> WatchStream<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: BufReader::new(reader).lines(),
        }
    }
}

impl<R: Read> Iterator for WatchStream<R> {
    type Item = Result<WatchEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(SpotwatchError::Io(e))),
            };
            if line.trim().is_empty() {
                continue;
            }
            return match decode_event(&line) {
                Ok(Some(event)) => Some(Ok(event)),
                Ok(None) => continue,
                Err(e) => Some(Err(e)),
            };
        }
    }
}

/// Decode one watch line. Bookmarks decode to `None`.
fn decode_event(line: &str) -> Result<Option<WatchEvent>> {
    let raw: RawEvent = serde_json::from_str(line)?;
    let activity = |object: Value| serde_json::from_value::<PipelineActivity>(object);
    match raw.event_type.as_str() {
        "ADDED" => Ok(Some(WatchEvent::Added(activity(raw.object)?))),
        "MODIFIED" => Ok(Some(WatchEvent::Modified(activity(raw.object)?))),
        "DELETED" => Ok(Some(WatchEvent::Deleted(activity(raw.object)?))),
        "BOOKMARK" => Ok(None),
        "ERROR" => {
            let message = raw
                .object
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown watch error")
                .to_string();
            Err(SpotwatchError::Store(format!("watch error: {}", message)))
        }
        other => Err(SpotwatchError::Store(format!(
            "unexpected watch event type '{}'",
            other
        ))),
    }
}
