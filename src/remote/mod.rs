pub(crate) mod http;
pub(crate) mod jsonp;
pub(crate) mod pending;

pub use http::HttpTransport;
pub use jsonp::JsonpTransport;
pub use pending::{PendingRequest, PendingTable, RequestId};

use crate::config::{PlannerConfig, ReadMode};
use crate::error::{SyncError, SyncResult};
use crate::models::{Envelope, PartialEnvelope};
use serde::Serialize;
use std::rc::Rc;

/// Read/write channel to the spreadsheet-backed endpoint.
///
/// `fetch` distinguishes "no remote data" (`Ok(None)`) from a failed read.
/// `push` is best effort; callers are expected to drop its error after
/// logging it.
#[allow(async_fn_in_trait)]
pub trait RemoteTransport {
    async fn fetch(&self, key: &str) -> SyncResult<Option<PartialEnvelope>>;
    async fn push(&self, key: &str, envelope: &Envelope) -> SyncResult<()>;
}

impl<T: RemoteTransport + ?Sized> RemoteTransport for Rc<T> {
    async fn fetch(&self, key: &str) -> SyncResult<Option<PartialEnvelope>> {
        (**self).fetch(key).await
    }

    async fn push(&self, key: &str, envelope: &Envelope) -> SyncResult<()> {
        (**self).push(key, envelope).await
    }
}

/// POST body understood by the sheet's `doPost`.
#[derive(Serialize, Clone, Debug)]
pub(crate) struct SaveRequest<'a> {
    pub action: &'static str,
    pub key: &'a str,
    pub data: &'a Envelope,
}

impl<'a> SaveRequest<'a> {
    pub fn new(key: &'a str, data: &'a Envelope) -> Self {
        Self {
            action: "save",
            key,
            data,
        }
    }
}

fn query_sep(url: &str) -> char {
    if url.contains('?') {
        '&'
    } else {
        '?'
    }
}

pub(crate) fn get_url(endpoint: &str, key: &str) -> String {
    format!(
        "{endpoint}{}action=get&key={}",
        query_sep(endpoint),
        urlencoding::encode(key)
    )
}

pub(crate) fn with_callback(url: &str, callback: &str) -> String {
    format!(
        "{url}{}callback={}",
        query_sep(url),
        urlencoding::encode(callback)
    )
}

/// Applies the `{ ok, data }` contract to a decoded response.
pub(crate) fn interpret_get_response(
    value: serde_json::Value,
) -> SyncResult<Option<PartialEnvelope>> {
    let ok = value
        .get("ok")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    if !ok {
        return Err(SyncError::transport("bad remote response"));
    }

    let data = match value.get("data") {
        None | Some(serde_json::Value::Null) => return Ok(None),
        Some(d) => d.clone(),
    };

    let partial: PartialEnvelope = serde_json::from_value(data).map_err(SyncError::parse)?;
    if partial.is_empty() {
        Ok(None)
    } else {
        Ok(Some(partial))
    }
}

/// The transport the app actually runs with, picked by config.
pub enum PlannerTransport {
    Jsonp(JsonpTransport),
    Cors(HttpTransport),
}

impl PlannerTransport {
    /// `None` when no endpoint is configured; remote sync is then skipped.
    pub fn from_config(config: &PlannerConfig) -> Option<Self> {
        let endpoint = config.endpoint.clone()?;
        Some(match config.read_mode {
            ReadMode::Jsonp => Self::Jsonp(JsonpTransport::new(endpoint)),
            ReadMode::Cors => Self::Cors(HttpTransport::new(endpoint)),
        })
    }
}

impl RemoteTransport for PlannerTransport {
    async fn fetch(&self, key: &str) -> SyncResult<Option<PartialEnvelope>> {
        match self {
            Self::Jsonp(t) => t.fetch(key).await,
            Self::Cors(t) => t.fetch(key).await,
        }
    }

    async fn push(&self, key: &str, envelope: &Envelope) -> SyncResult<()> {
        match self {
            Self::Jsonp(t) => t.push(key, envelope).await,
            Self::Cors(t) => t.push(key, envelope).await,
        }
    }
}
