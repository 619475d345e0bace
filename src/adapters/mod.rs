// Adapters layer: concrete clients for the scoring service and the notification relay.

pub mod notify;
pub mod scoring;

pub use notify::{prepare_notification, EmailJsRelay};
pub use scoring::HttpScoringClient;
