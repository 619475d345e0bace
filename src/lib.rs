pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::TomlConfig;

pub use adapters::{EmailJsRelay, HttpScoringClient};
pub use crate::core::controller::{FormController, SubmitOutcome};
pub use crate::core::header::HeaderReader;
pub use crate::core::presenter::ResultView;
pub use crate::core::session::{FormSession, SubmissionState};
pub use crate::core::validator::{count_tokens, ValidationRules};
pub use utils::error::{NotificationError, Result, ScoringError, TopsisError};
