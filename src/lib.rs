mod app;
pub mod config;
pub mod error;
pub mod models;
pub mod remote;
mod state;
pub mod storage;
pub mod store;
pub mod sync;
pub mod util;

pub use app::App;
pub use config::PlannerConfig;
pub use error::{SyncError, SyncResult};
pub use models::{Envelope, Idea, PartialEnvelope, RecordId, Status, Win};

use leptos::prelude::*;

// Needed for `#[wasm_bindgen(start)]` on the wasm entrypoint.
#[cfg(all(target_arch = "wasm32", not(test)))]
use wasm_bindgen::prelude::wasm_bindgen;

// Only register the WASM start function for normal builds (not for tests),
// otherwise wasm-bindgen-test will end up with multiple entry symbols.
#[cfg_attr(all(target_arch = "wasm32", not(test)), wasm_bindgen(start))]
pub fn main() {
    console_error_panic_hook::set_once();

    let config = PlannerConfig::from_window();
    _ = console_log::init_with_level(config.log_level);
    log::info!("focus planner starting");

    mount_to_body(move || view! { <App config=config /> });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_blob_contract_deserialize() {
        // Blob shape written by earlier versions of the planner: millisecond
        // ids, display-form statuses, camelCase `grantUse`.
        let json = r#"{
            "ideas": [
                {"id": 1718000000000, "title": "Apply for CAC grant", "status": "On Hold",
                 "notes": "", "blockers": "board vote", "gaps": ""}
            ],
            "wins": [
                {"id": 1718000000001, "title": "Roof restored", "when": "Fall 2024",
                 "impact": "kept the house open", "grantUse": "proof of capacity"}
            ]
        }"#;
        let env: Envelope = serde_json::from_str(json).expect("blob should parse");
        assert_eq!(env.ideas[0].id, RecordId(1718000000000));
        assert_eq!(env.ideas[0].fields.status, Status::OnHold);
        assert_eq!(env.wins[0].fields.grant_use, "proof of capacity");

        let back = serde_json::to_value(&env).expect("should serialize");
        assert_eq!(back["ideas"][0]["status"], "On Hold");
        assert_eq!(back["wins"][0]["grantUse"], "proof of capacity");
        assert_eq!(back["wins"][0]["id"], 1718000000001i64);
    }

    #[test]
    fn test_envelope_without_lists_is_empty() {
        let env: Envelope = serde_json::from_str("{}").expect("empty object should parse");
        assert!(env.ideas.is_empty());
        assert!(env.wins.is_empty());
    }
}
