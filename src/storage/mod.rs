use crate::error::{SyncError, SyncResult};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::{spawn_local, JsFuture};

/// Key/value persistence for the local copy of the planner.
///
/// Writes never block the caller. Reads go through [`LocalMirror::read`],
/// which backends with an asynchronous host override.
#[allow(async_fn_in_trait)]
pub trait LocalMirror {
    fn get(&self, key: &str) -> SyncResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> SyncResult<()>;

    async fn read(&self, key: &str) -> SyncResult<Option<String>> {
        self.get(key)
    }
}

impl<M: LocalMirror + ?Sized> LocalMirror for Rc<M> {
    fn get(&self, key: &str) -> SyncResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> SyncResult<()> {
        (**self).set(key, value)
    }

    async fn read(&self, key: &str) -> SyncResult<Option<String>> {
        (**self).read(key).await
    }
}

pub(crate) async fn load_json<T: for<'de> Deserialize<'de>>(
    mirror: &impl LocalMirror,
    key: &str,
) -> SyncResult<Option<T>> {
    let Some(json) = mirror.read(key).await? else {
        return Ok(None);
    };
    if json.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(&json).map(Some).map_err(SyncError::parse)
}

pub(crate) fn save_json<T: Serialize>(
    mirror: &impl LocalMirror,
    key: &str,
    value: &T,
) -> SyncResult<()> {
    let json = serde_json::to_string(value).map_err(SyncError::parse)?;
    mirror.set(key, &json)
}

/// `window.localStorage`.
#[derive(Clone)]
pub struct BrowserStorage {
    storage: web_sys::Storage,
}

impl BrowserStorage {
    pub fn open() -> Option<Self> {
        let storage = web_sys::window().and_then(|w| w.local_storage().ok().flatten())?;
        Some(Self { storage })
    }
}

impl LocalMirror for BrowserStorage {
    fn get(&self, key: &str) -> SyncResult<Option<String>> {
        self.storage.get_item(key).map_err(SyncError::storage)
    }

    fn set(&self, key: &str, value: &str) -> SyncResult<()> {
        self.storage.set_item(key, value).map_err(SyncError::storage)
    }
}

/// A storage facility injected by the embedding host as `window.storage`.
///
/// `get(key)` may return the raw string or a `{ value }` record, either
/// directly or through a Promise. `set` may also return a Promise; a rejected
/// write is logged.
#[derive(Clone)]
pub struct HostStorage {
    target: js_sys::Object,
    get_fn: js_sys::Function,
    set_fn: js_sys::Function,
}

impl HostStorage {
    pub fn detect() -> Option<Self> {
        let window = web_sys::window()?;
        let target = js_sys::Reflect::get(&window, &"storage".into()).ok()?;
        if target.is_undefined() || target.is_null() || !target.is_object() {
            return None;
        }
        // A real `Storage` here means the page aliased localStorage; use that path instead.
        if target.is_instance_of::<web_sys::Storage>() {
            return None;
        }

        let get_fn = js_sys::Reflect::get(&target, &"get".into())
            .ok()?
            .dyn_into::<js_sys::Function>()
            .ok()?;
        let set_fn = js_sys::Reflect::get(&target, &"set".into())
            .ok()?
            .dyn_into::<js_sys::Function>()
            .ok()?;

        Some(Self {
            target: target.unchecked_into(),
            get_fn,
            set_fn,
        })
    }
}

impl HostStorage {
    fn call_get(&self, key: &str) -> SyncResult<JsValue> {
        self.get_fn
            .call1(&self.target, &key.into())
            .map_err(SyncError::storage)
    }
}

fn host_value(out: JsValue) -> SyncResult<Option<String>> {
    if let Some(s) = out.as_string() {
        return Ok(Some(s));
    }
    if out.is_undefined() || out.is_null() {
        return Ok(None);
    }
    let value = js_sys::Reflect::get(&out, &"value".into()).map_err(SyncError::storage)?;
    Ok(value.as_string())
}

impl LocalMirror for HostStorage {
    /// Synchronous hosts only; a pending Promise reads as empty here.
    fn get(&self, key: &str) -> SyncResult<Option<String>> {
        let out = self.call_get(key)?;
        if out.is_instance_of::<js_sys::Promise>() {
            log::debug!("host storage get({key}) is async; use read");
            return Ok(None);
        }
        host_value(out)
    }

    fn set(&self, key: &str, value: &str) -> SyncResult<()> {
        let out = self
            .set_fn
            .call2(&self.target, &key.into(), &value.into())
            .map_err(SyncError::storage)?;

        if let Ok(promise) = out.dyn_into::<js_sys::Promise>() {
            let key = key.to_string();
            spawn_local(async move {
                if let Err(e) = JsFuture::from(promise).await {
                    log::warn!("host storage write for {key} failed: {e:?}");
                }
            });
        }
        Ok(())
    }

    async fn read(&self, key: &str) -> SyncResult<Option<String>> {
        let out = self.call_get(key)?;
        match out.dyn_into::<js_sys::Promise>() {
            Ok(promise) => {
                let resolved = JsFuture::from(promise)
                    .await
                    .map_err(SyncError::storage)?;
                host_value(resolved)
            }
            Err(out) => host_value(out),
        }
    }
}

/// Process-local map; the fallback when nothing persistent is available.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    items: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalMirror for MemoryStorage {
    fn get(&self, key: &str) -> SyncResult<Option<String>> {
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> SyncResult<()> {
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[derive(Clone)]
pub enum Mirror {
    Host(HostStorage),
    Browser(BrowserStorage),
    Memory(MemoryStorage),
}

impl Mirror {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Host(_) => "host",
            Self::Browser(_) => "localStorage",
            Self::Memory(_) => "memory",
        }
    }
}

impl LocalMirror for Mirror {
    fn get(&self, key: &str) -> SyncResult<Option<String>> {
        match self {
            Self::Host(s) => s.get(key),
            Self::Browser(s) => s.get(key),
            Self::Memory(s) => s.get(key),
        }
    }

    fn set(&self, key: &str, value: &str) -> SyncResult<()> {
        match self {
            Self::Host(s) => s.set(key, value),
            Self::Browser(s) => s.set(key, value),
            Self::Memory(s) => s.set(key, value),
        }
    }

    async fn read(&self, key: &str) -> SyncResult<Option<String>> {
        match self {
            Self::Host(s) => s.read(key).await,
            Self::Browser(s) => s.read(key).await,
            Self::Memory(s) => s.read(key).await,
        }
    }
}

/// Host storage if the page provides one, else localStorage, else memory.
pub fn detect_mirror() -> Mirror {
    if let Some(host) = HostStorage::detect() {
        return Mirror::Host(host);
    }
    if let Some(browser) = BrowserStorage::open() {
        return Mirror::Browser(browser);
    }
    log::warn!("no persistent storage available; planner data will not survive a reload");
    Mirror::Memory(MemoryStorage::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Envelope, Idea, IdeaDraft, RecordId};
    use futures::executor::block_on;

    #[test]
    fn test_memory_storage_roundtrip() {
        let m = MemoryStorage::new();
        assert_eq!(m.get("k").unwrap(), None);
        m.set("k", "v").unwrap();
        assert_eq!(m.get("k").unwrap().as_deref(), Some("v"));

        // Clones share the same backing map.
        let m2 = m.clone();
        m2.set("k", "w").unwrap();
        assert_eq!(m.get("k").unwrap().as_deref(), Some("w"));
    }

    #[test]
    fn test_json_roundtrip_through_mirror() {
        let m = Mirror::Memory(MemoryStorage::new());
        let env = Envelope {
            ideas: vec![Idea {
                id: RecordId(1),
                fields: IdeaDraft {
                    title: "A".to_string(),
                    ..Default::default()
                },
            }],
            wins: vec![],
        };
        save_json(&m, "key", &env).unwrap();
        let back: Option<Envelope> = block_on(load_json(&m, "key")).unwrap();
        assert_eq!(back, Some(env));
        assert_eq!(m.name(), "memory");
    }

    #[test]
    fn test_load_json_reports_malformed_blob() {
        let m = MemoryStorage::new();
        m.set("key", "{not json").unwrap();
        let err = block_on(load_json::<Envelope>(&m, "key")).unwrap_err();
        assert!(matches!(err, SyncError::Parse(_)));
    }

    #[test]
    fn test_read_defaults_to_get_for_sync_backends() {
        let m = Mirror::Memory(MemoryStorage::new());
        m.set("key", "v").unwrap();
        assert_eq!(block_on(m.read("key")).unwrap().as_deref(), Some("v"));
        assert_eq!(block_on(m.read("other")).unwrap(), None);
    }

    #[test]
    fn test_load_json_treats_blank_as_missing() {
        let m = MemoryStorage::new();
        m.set("key", "  ").unwrap();
        assert_eq!(block_on(load_json::<Envelope>(&m, "key")).unwrap(), None);
    }
}
