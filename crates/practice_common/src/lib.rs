//! Shared library for the subtraction practice service: configuration,
//! SQLite-backed stores, reward catalog, question generator and the
//! practice session flow.

pub mod api;
pub mod config;
pub mod credentials;
pub mod db;
pub mod error;
pub mod inventory;
pub mod practice_log;
pub mod questions;
pub mod rewards;
pub mod session;

pub use config::PracticeConfig;
pub use credentials::{CredentialStore, RegisterOutcome};
pub use db::{DbLocation, PracticeDb};
pub use error::{PracticeError, PracticeResult};
pub use inventory::InventoryStore;
pub use practice_log::{PracticeEntry, PracticeLog, PracticeStats};
pub use questions::{Question, QuestionGenerator};
pub use rewards::{RewardCatalog, RewardItem};
pub use session::{Phase, PracticeFlow, PracticeSession, SessionSnapshot};
