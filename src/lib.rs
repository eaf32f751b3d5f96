// Library root
// -----------
// Everything the `nakala-cli` binary does lives here so it can be tested
// without a terminal.
//
// Module responsibilities:
// - `config`: environment settings and the fixed NAKALA constants.
// - `metadata`: typed request and response payloads.
// - `converter`: CSV rows to NAKALA dataset payloads, plus validation.
// - `api`: blocking HTTP client, one method per endpoint.
// - `ui`: console narration, before/after comparison and the menu.
// - `demos`: guided walkthroughs built on `api` and `ui`.
pub mod api;
pub mod config;
pub mod converter;
pub mod demos;
pub mod error;
pub mod metadata;
pub mod ui;

pub use api::{ApiClient, ApiResponse};
pub use config::Config;
pub use error::{NakalaError, Result};
