use std::time::Duration;

/// Fixed storage key, shared by the local mirror and the remote sheet.
pub const PLANNER_KEY: &str = "nsh-planner-v2";

/// Marker left in the deploy template until someone pastes a real URL.
pub const ENDPOINT_PLACEHOLDER: &str = "PASTE_YOUR_APPS_SCRIPT";

pub const DEFAULT_READ_TIMEOUT_MS: u64 = 12_000;
pub const DEFAULT_OUTBOX_CAPACITY: usize = 8;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReadMode {
    /// Script injection with a named callback; works without CORS headers.
    #[default]
    Jsonp,
    /// Plain GET; the endpoint must send CORS headers.
    Cors,
}

impl ReadMode {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jsonp" => Some(Self::Jsonp),
            "cors" | "http" => Some(Self::Cors),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlannerConfig {
    /// `None` when absent or still the placeholder; remote sync is off then.
    pub endpoint: Option<String>,
    pub read_timeout: Duration,
    pub read_mode: ReadMode,
    pub log_level: log::Level,
    pub outbox_capacity: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            read_timeout: Duration::from_millis(DEFAULT_READ_TIMEOUT_MS),
            read_mode: ReadMode::default(),
            log_level: log::Level::Info,
            outbox_capacity: DEFAULT_OUTBOX_CAPACITY,
        }
    }
}

/// Returns the endpoint only if it looks like something a human configured.
pub fn configured_endpoint(raw: Option<&str>) -> Option<String> {
    let raw = raw?.trim();
    if raw.is_empty() || raw.contains(ENDPOINT_PLACEHOLDER) {
        return None;
    }
    Some(raw.to_string())
}

impl PlannerConfig {
    /// Builds the config from a key lookup. Bad values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let endpoint = configured_endpoint(
            lookup("PLANNER_SHEETS_URL")
                .or_else(|| lookup("planner_sheets_url"))
                .as_deref(),
        );

        let read_timeout = lookup("PLANNER_READ_TIMEOUT_MS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(defaults.read_timeout);

        let read_mode = lookup("PLANNER_READ_MODE")
            .and_then(|v| ReadMode::parse(&v))
            .unwrap_or(defaults.read_mode);

        let log_level = lookup("PLANNER_LOG_LEVEL")
            .and_then(|v| v.trim().parse::<log::Level>().ok())
            .unwrap_or(defaults.log_level);

        let outbox_capacity = lookup("PLANNER_OUTBOX_CAPACITY")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(defaults.outbox_capacity);

        Self {
            endpoint,
            read_timeout,
            read_mode,
            log_level,
            outbox_capacity,
        }
    }

    /// Reads `window.PLANNER_*` first, then `window.ENV.PLANNER_*`.
    pub fn from_window() -> Self {
        Self::from_lookup(window_value)
    }

    pub fn remote_enabled(&self) -> bool {
        self.endpoint.is_some()
    }
}

fn window_value(key: &str) -> Option<String> {
    let window = web_sys::window()?;

    let as_string = |v: wasm_bindgen::JsValue| -> Option<String> {
        if v.is_undefined() || v.is_null() {
            return None;
        }
        v.as_string().or_else(|| v.as_f64().map(|n| n.to_string()))
    };

    if let Ok(v) = js_sys::Reflect::get(&window, &key.into()) {
        if let Some(s) = as_string(v) {
            return Some(s);
        }
    }

    let env = js_sys::Reflect::get(&window, &"ENV".into()).ok()?;
    if env.is_undefined() || !env.is_object() {
        return None;
    }
    js_sys::Reflect::get(&env, &key.into())
        .ok()
        .and_then(as_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let c = PlannerConfig::from_lookup(|_| None);
        assert_eq!(c, PlannerConfig::default());
        assert!(!c.remote_enabled());
        assert_eq!(c.read_timeout, Duration::from_secs(12));
    }

    #[test]
    fn test_placeholder_endpoint_disables_remote() {
        let c = PlannerConfig::from_lookup(lookup_from(&[(
            "PLANNER_SHEETS_URL",
            "PASTE_YOUR_APPS_SCRIPT_WEB_APP_URL_HERE",
        )]));
        assert_eq!(c.endpoint, None);

        assert_eq!(configured_endpoint(Some("   ")), None);
        assert_eq!(configured_endpoint(None), None);
    }

    #[test]
    fn test_configured_endpoint_is_trimmed() {
        let c = PlannerConfig::from_lookup(lookup_from(&[(
            "planner_sheets_url",
            " https://script.google.com/macros/s/abc/exec ",
        )]));
        assert_eq!(
            c.endpoint.as_deref(),
            Some("https://script.google.com/macros/s/abc/exec")
        );
    }

    #[test]
    fn test_optional_values_parse() {
        let c = PlannerConfig::from_lookup(lookup_from(&[
            ("PLANNER_READ_TIMEOUT_MS", "3000"),
            ("PLANNER_READ_MODE", "CORS"),
            ("PLANNER_LOG_LEVEL", "debug"),
            ("PLANNER_OUTBOX_CAPACITY", "2"),
        ]));
        assert_eq!(c.read_timeout, Duration::from_millis(3000));
        assert_eq!(c.read_mode, ReadMode::Cors);
        assert_eq!(c.log_level, log::Level::Debug);
        assert_eq!(c.outbox_capacity, 2);
    }

    #[test]
    fn test_bad_values_fall_back_to_defaults() {
        let c = PlannerConfig::from_lookup(lookup_from(&[
            ("PLANNER_READ_TIMEOUT_MS", "soon"),
            ("PLANNER_READ_MODE", "carrier-pigeon"),
            ("PLANNER_LOG_LEVEL", "loud"),
            ("PLANNER_OUTBOX_CAPACITY", "0"),
        ]));
        assert_eq!(c, PlannerConfig::default());
    }
}
