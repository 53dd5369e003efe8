//! Blocking client for the Cloudflare Workers KV REST API.
//!
//! ```text
//! GET    {base}/keys?limit=1000[&cursor=..][&prefix=..]
//! GET    {base}/values/{key}
//! PUT    {base}/values/{key}
//! PUT    {base}/bulk        [{"key","value","base64"}]
//! DELETE {base}/bulk        ["key", ...]
//! ```
//!
//! `base` is `{api}/accounts/{account}/storage/kv/namespaces/{namespace}`.

use std::io::Read;
use std::time::Duration;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::de::DeserializeOwned;

use kvsync_core::{Auth, BulkEntry, Credentials, KvError, KvOp, KvStore};

use crate::wire::{Envelope, KeyInfo};

/// Public API root.
pub const API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Keys requested per list page; the service maximum.
const PAGE_LIMIT: usize = 1000;

/// Escapes everything except RFC 3986 unreserved characters.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// [`KvStore`] backed by one Workers KV namespace.
pub struct CloudflareKv {
    agent: ureq::Agent,
    namespace_url: String,
    auth: Auth,
}

impl CloudflareKv {
    pub fn new(credentials: &Credentials) -> Self {
        Self::with_api_base(credentials, API_BASE)
    }

    /// Point the client at a different API root (local stubs, proxies).
    pub fn with_api_base(credentials: &Credentials, api_base: &str) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(30))
            .build();
        Self {
            agent,
            namespace_url: namespace_url(api_base, credentials),
            auth: credentials.auth.clone(),
        }
    }

    fn request(&self, method: &str, url: &str) -> ureq::Request {
        tracing::debug!(method, url, "kv request");
        let request = self.agent.request(method, url);
        match &self.auth {
            Auth::Token(token) => request.set("Authorization", &format!("Bearer {token}")),
            Auth::Key { key, email } => request.set("X-Auth-Key", key).set("X-Auth-Email", email),
        }
    }

    fn value_url(&self, key: &str) -> String {
        format!(
            "{}/values/{}",
            self.namespace_url,
            utf8_percent_encode(key, SEGMENT)
        )
    }

    fn bulk_url(&self) -> String {
        format!("{}/bulk", self.namespace_url)
    }

    fn keys_url(&self, prefix: Option<&str>, cursor: Option<&str>) -> String {
        let mut url = format!("{}/keys?limit={PAGE_LIMIT}", self.namespace_url);
        if let Some(cursor) = cursor {
            url.push_str("&cursor=");
            url.extend(utf8_percent_encode(cursor, SEGMENT));
        }
        if let Some(prefix) = prefix.filter(|p| !p.is_empty()) {
            url.push_str("&prefix=");
            url.extend(utf8_percent_encode(prefix, SEGMENT));
        }
        url
    }
}

impl KvStore for CloudflareKv {
    fn list(&self, prefix: Option<&str>) -> Result<Vec<String>, KvError> {
        let mut keys = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let url = self.keys_url(prefix, cursor.as_deref());
            let response = self
                .request("GET", &url)
                .call()
                .map_err(|e| map_ureq(KvOp::List, e))?;
            let page: Envelope<Vec<KeyInfo>> = read_envelope(KvOp::List, response)?;
            keys.extend(page.result.iter().flatten().map(|k| k.name.clone()));
            match page.next_cursor() {
                Some(next) => cursor = Some(next.to_string()),
                None => break,
            }
        }
        tracing::debug!(count = keys.len(), "listed keys");
        Ok(keys)
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError> {
        let response = match self.request("GET", &self.value_url(key)).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(404, _)) => return Ok(None),
            Err(err) => return Err(map_ureq(KvOp::Get, err)),
        };
        let mut body = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut body)
            .map_err(|e| KvError::Decode {
                op: KvOp::Get,
                message: e.to_string(),
            })?;
        Ok(Some(body))
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), KvError> {
        let response = self
            .request("PUT", &self.value_url(key))
            .set("Content-Type", "application/json")
            .send_bytes(value)
            .map_err(|e| map_ureq(KvOp::Put, e))?;
        check_write(KvOp::Put, response)
    }

    fn put_bulk(&self, entries: &[BulkEntry]) -> Result<(), KvError> {
        let response = self
            .request("PUT", &self.bulk_url())
            .send_json(entries)
            .map_err(|e| map_ureq(KvOp::PutBulk, e))?;
        check_write(KvOp::PutBulk, response)
    }

    fn delete_bulk(&self, keys: &[String]) -> Result<(), KvError> {
        let response = self
            .request("DELETE", &self.bulk_url())
            .send_json(keys)
            .map_err(|e| map_ureq(KvOp::DeleteBulk, e))?;
        check_write(KvOp::DeleteBulk, response)
    }
}

pub(crate) fn namespace_url(api_base: &str, credentials: &Credentials) -> String {
    format!(
        "{}/accounts/{}/storage/kv/namespaces/{}",
        api_base.trim_end_matches('/'),
        credentials.account_id,
        credentials.namespace_id
    )
}

fn map_ureq(op: KvOp, err: ureq::Error) -> KvError {
    match err {
        ureq::Error::Status(status, response) => KvError::Status {
            op,
            status,
            body: response.into_string().unwrap_or_default(),
        },
        ureq::Error::Transport(transport) => KvError::Transport {
            op,
            message: transport.to_string(),
        },
    }
}

fn read_envelope<T: DeserializeOwned>(
    op: KvOp,
    response: ureq::Response,
) -> Result<Envelope<T>, KvError> {
    let envelope: Envelope<T> = response.into_json().map_err(|e| KvError::Decode {
        op,
        message: e.to_string(),
    })?;
    if !envelope.success {
        return Err(KvError::Rejected {
            op,
            message: envelope.error_summary(),
        });
    }
    Ok(envelope)
}

/// Write endpoints answer with an envelope; an empty body is accepted too.
fn check_write(op: KvOp, response: ureq::Response) -> Result<(), KvError> {
    let body = response.into_string().map_err(|e| KvError::Decode {
        op,
        message: e.to_string(),
    })?;
    if body.trim().is_empty() {
        return Ok(());
    }
    let envelope: Envelope<serde_json::Value> =
        serde_json::from_str(&body).map_err(|e| KvError::Decode {
            op,
            message: e.to_string(),
        })?;
    if !envelope.success {
        return Err(KvError::Rejected {
            op,
            message: envelope.error_summary(),
        });
    }
    Ok(())
}
