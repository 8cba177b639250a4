//! Device session layer between `camlink-api` and the CLI.
//!
//! This crate owns the connection lifecycle, discovery, and settings for a
//! single network-attached camera:
//!
//! - **[`Session`]** - State machine driving one camera through
//!   `Disconnected → Connecting → Connected ⇄ Recording`. Each intent
//!   ([`connect()`](Session::connect), [`start_recording()`](Session::start_recording),
//!   [`disconnect()`](Session::disconnect), …) is validated against the
//!   current state and applied atomically once the device answers.
//!
//! - **[`Scanner`]** - Sequential prober over prioritized candidate
//!   addresses; the first valid `camera-info` answer wins.
//!
//! - **[`SettingsStore`]** - Validated capture settings, updated by
//!   all-or-nothing [`SettingsPatch`]es.
//!
//! - **[`SnapshotStream`]** - Subscription handle for immutable
//!   [`SessionSnapshot`]s. Exposes `current()` / `latest()` / `changed()`.

pub mod config;
pub mod convert;
pub mod error;
pub mod model;
pub mod scanner;
pub mod session;
pub mod settings;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::SessionConfig;
pub use error::CoreError;
pub use model::{CameraInfo, ConnectionState, Intent, OperationalStatus, SessionSnapshot};
pub use scanner::{AttemptOutcome, ScanAttempt, ScanHit, Scanner, candidate_list};
pub use session::Session;
pub use settings::{CaptureMode, Quality, Resolution, Settings, SettingsPatch, SettingsStore};
pub use stream::{SnapshotStream, SnapshotWatchStream};

// Wire-level types that appear in the public API.
pub use camlink_api::{DeviceAddress, Error as ApiError, FailureKind, StreamLocator, StreamTemplate};
