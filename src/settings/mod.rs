//! Per-service settings persistence
//!
//! Each service instance owns one opaque settings blob, addressed by its
//! service ID. The layering is:
//!
//! ```text
//! SettingsBackend (bytes by key) ──▶ SettingsStore (typed JSON, per-key locks)
//!                                         │
//!                                         ├──▶ ScopedSettings (one service ID)
//!                                         └──▶ SettingsView<T> (live value, save on every write)
//! ```

mod backend;
mod store;
mod view;

pub(crate) use backend::validate_key;
pub use backend::{FileSettingsBackend, MemorySettingsBackend, SettingsBackend};
pub use store::{ScopedSettings, SettingsStore};
pub use view::{SettingsView, Subscription};
