use super::{get_url, interpret_get_response, RemoteTransport, SaveRequest};
use crate::error::{SyncError, SyncResult};
use crate::models::{Envelope, PartialEnvelope};

/// The sheet's `doPost` only accepts simple requests; anything else would
/// trigger a preflight it cannot answer.
pub(crate) const SAVE_CONTENT_TYPE: &str = "text/plain;charset=utf-8";

/// Plain HTTP transport: CORS GET for reads, best-effort POST for writes.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(endpoint: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub(crate) fn save_body(key: &str, envelope: &Envelope) -> SyncResult<String> {
        serde_json::to_string(&SaveRequest::new(key, envelope)).map_err(SyncError::parse)
    }
}

impl RemoteTransport for HttpTransport {
    async fn fetch(&self, key: &str) -> SyncResult<Option<PartialEnvelope>> {
        let res = self
            .client
            .get(get_url(&self.endpoint, key))
            .send()
            .await
            .map_err(SyncError::transport)?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(SyncError::RemoteTransport(format!(
                "remote read failed ({status}): {body}"
            )));
        }

        let value: serde_json::Value = res.json().await.map_err(SyncError::parse)?;
        interpret_get_response(value)
    }

    async fn push(&self, key: &str, envelope: &Envelope) -> SyncResult<()> {
        let body = Self::save_body(key, envelope)?;

        let req = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, SAVE_CONTENT_TYPE)
            .body(body);

        // The response of a cross-origin save is opaque in the browser; never read it.
        #[cfg(target_arch = "wasm32")]
        let req = req.fetch_mode_no_cors();

        req.send().await.map_err(SyncError::write)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_body_is_single_line_json() {
        let body = HttpTransport::save_body("nsh-planner-v2", &Envelope::default()).unwrap();
        assert_eq!(
            body,
            r#"{"action":"save","key":"nsh-planner-v2","data":{"ideas":[],"wins":[]}}"#
        );
    }

    #[test]
    fn test_new_keeps_endpoint() {
        let t = HttpTransport::new("https://x.test/exec".to_string());
        assert_eq!(t.endpoint(), "https://x.test/exec");
    }
}
