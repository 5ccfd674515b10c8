use voxdesk_core::wire::CatalogResponse;

use crate::util::{EXIT_OK, EXIT_SERVER, exit_error, print_json};

/// Print the supported languages, voices and ranges. Works offline.
pub fn run() -> i32 {
    match serde_json::to_value(CatalogResponse::current()) {
        Ok(value) => {
            print_json(&value);
            EXIT_OK
        }
        Err(e) => exit_error(&format!("Failed to render catalog: {e}"), None, EXIT_SERVER),
    }
}
