use super::pending::PendingTable;
use super::{get_url, interpret_get_response, with_callback, HttpTransport, RemoteTransport};
use crate::error::{SyncError, SyncResult};
use crate::models::{Envelope, PartialEnvelope};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};

const CALLBACK_PREFIX: &str = "__planner_jsonp_";

type Delivery = SyncResult<serde_json::Value>;

fn js_err(e: JsValue) -> SyncError {
    SyncError::RemoteTransport(format!("{e:?}"))
}

/// Reads by injecting a `<script>` whose body calls back into a per-request
/// global; writes go through [`HttpTransport`].
///
/// The endpoint cannot send CORS headers on GET, but it can wrap its JSON in
/// `callback(...)`. Every request registers in a [`PendingTable`], and the
/// callback name carries the request id, so overlapping reads resolve
/// independently. The global, the script element and the closures live only
/// as long as the pending request.
///
/// `fetch` has no deadline of its own: a script that never calls back keeps
/// it pending. Bound it with [`crate::util::with_timeout`] (the sync
/// orchestrator does); dropping the future releases everything.
#[derive(Clone)]
pub struct JsonpTransport {
    endpoint: String,
    table: PendingTable<Delivery>,
    writer: HttpTransport,
}

impl JsonpTransport {
    pub fn new(endpoint: String) -> Self {
        Self {
            writer: HttpTransport::new(endpoint.clone()),
            endpoint,
            table: PendingTable::new(),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.table.in_flight()
    }

    async fn request(&self, url: &str) -> SyncResult<serde_json::Value> {
        let window = web_sys::window().ok_or_else(|| SyncError::transport("no window"))?;
        let document = window
            .document()
            .ok_or_else(|| SyncError::transport("no document"))?;
        let head = document
            .head()
            .ok_or_else(|| SyncError::transport("no document head"))?;

        let mut pending = self.table.register();
        let callback = format!("{CALLBACK_PREFIX}{}", pending.id());

        let on_data = {
            let table = self.table.clone();
            let id = pending.id().clone();
            Closure::<dyn FnMut(JsValue)>::new(move |data: JsValue| {
                let delivery = js_sys::JSON::stringify(&data)
                    .ok()
                    .and_then(|s| s.as_string())
                    .ok_or_else(|| SyncError::parse("callback payload is not JSON"))
                    .and_then(|s| serde_json::from_str(&s).map_err(SyncError::parse));
                table.resolve(&id, delivery);
            })
        };

        let on_error = {
            let table = self.table.clone();
            let id = pending.id().clone();
            Closure::<dyn FnMut(web_sys::Event)>::new(move |_ev: web_sys::Event| {
                table.resolve(&id, Err(SyncError::transport("failed to load script")));
            })
        };

        let script: web_sys::HtmlScriptElement = document
            .create_element("script")
            .map_err(js_err)?
            .dyn_into()
            .map_err(|_| SyncError::transport("created element is not a script"))?;

        js_sys::Reflect::set(&window, &JsValue::from_str(&callback), on_data.as_ref())
            .map_err(js_err)?;
        script.set_onerror(Some(on_error.as_ref().unchecked_ref()));
        script.set_src(&with_callback(url, &callback));

        {
            let window = window.clone();
            let script = script.clone();
            let callback = callback.clone();
            pending.on_cleanup(move || {
                let _ = js_sys::Reflect::delete_property(&window, &JsValue::from_str(&callback));
                script.set_onerror(None);
                script.remove();
                drop(on_data);
                drop(on_error);
            });
        }

        head.append_child(&script).map_err(js_err)?;

        pending.await?
    }
}

impl RemoteTransport for JsonpTransport {
    async fn fetch(&self, key: &str) -> SyncResult<Option<PartialEnvelope>> {
        let value = self.request(&get_url(&self.endpoint, key)).await?;
        interpret_get_response(value)
    }

    async fn push(&self, key: &str, envelope: &Envelope) -> SyncResult<()> {
        self.writer.push(key, envelope).await
    }
}

// WASM-only tests (run with `cargo test --target wasm32-unknown-unknown` + wasm-bindgen-test-runner)
#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use crate::util::with_timeout;
    use std::time::Duration;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn data_url(body: &str) -> String {
        format!(
            "data:text/javascript,{}",
            js_sys::encode_uri_component(body)
                .as_string()
                .unwrap_or_default()
        )
    }

    fn planner_globals() -> usize {
        let window = web_sys::window().unwrap();
        js_sys::Object::keys(&window)
            .iter()
            .filter_map(|k| k.as_string())
            .filter(|k| k.starts_with(CALLBACK_PREFIX))
            .count()
    }

    fn head_children() -> u32 {
        web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.head())
            .map(|h| h.child_element_count())
            .unwrap_or_default()
    }

    /// A script that answers through the callback named in its own URL.
    /// The trailing `//` comments out the query string appended to it.
    fn answering_with(payload: &str) -> String {
        data_url(&format!(
            "(function () {{ \
               var s = document.currentScript.src; \
               var name = decodeURIComponent(s.slice(s.lastIndexOf('callback=') + 9)); \
               window[name]({payload}); \
             }})();//"
        ))
    }

    #[wasm_bindgen_test]
    async fn test_callback_delivers_payload_and_cleans_up() {
        let before = head_children();
        let t = JsonpTransport::new(answering_with(
            "{ ok: true, data: { ideas: [{ id: 3, title: 'Launch youth program' }] } }",
        ));

        let out = with_timeout(Duration::from_secs(5), t.fetch("nsh-planner-v2"))
            .await
            .expect("callback should arrive before the timeout")
            .expect("read should succeed")
            .expect("payload carries ideas");

        let ideas = out.ideas.expect("ideas present");
        assert_eq!(ideas.len(), 1);
        assert_eq!(ideas[0].fields.title, "Launch youth program");
        assert!(out.wins.is_none());

        assert_eq!(t.in_flight(), 0);
        assert_eq!(planner_globals(), 0);
        assert_eq!(head_children(), before);
    }

    #[wasm_bindgen_test]
    async fn test_rejected_response_is_a_transport_error() {
        let t = JsonpTransport::new(answering_with("{ ok: false, error: 'no sheet' }"));
        let out = with_timeout(Duration::from_secs(5), t.fetch("k")).await;
        assert!(matches!(out, Ok(Err(SyncError::RemoteTransport(_)))));
        assert_eq!(t.in_flight(), 0);
        assert_eq!(planner_globals(), 0);
    }

    #[wasm_bindgen_test]
    async fn test_load_error_rejects_and_cleans_up() {
        let t = JsonpTransport::new("https://127.0.0.1:9/never".to_string());
        // `data:` script that throws still loads; use an unreachable URL for onerror.
        let out = with_timeout(Duration::from_secs(10), t.fetch("k")).await;
        assert!(matches!(out, Ok(Err(SyncError::RemoteTransport(_)))));
        assert_eq!(t.in_flight(), 0);
        assert_eq!(planner_globals(), 0);
    }

    #[wasm_bindgen_test]
    async fn test_timeout_drops_callback_global() {
        // A script that never calls back.
        let t = JsonpTransport::new(data_url("void 0;//"));
        let out = with_timeout(Duration::from_millis(200), t.fetch("k")).await;
        assert!(out.is_err());
        assert_eq!(t.in_flight(), 0);
        assert_eq!(planner_globals(), 0);
    }
}
