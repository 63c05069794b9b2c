// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod config;
pub mod error;
pub mod lead;
pub mod log_sink;
pub mod matcher;
pub mod metrics;
pub mod pitch;
pub mod scanner;
pub mod sources;
pub mod store;

// Webhook alerts and outreach email
pub mod notify;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::error::{ControlError, StoreError};
pub use crate::lead::{Lead, LeadSource, LeadStatus, RawItem};
pub use crate::scanner::{ScanContext, ScannerController, ScannerState};
