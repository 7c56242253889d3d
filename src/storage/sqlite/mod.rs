//! SQLite implementations of storage interfaces.

mod code_store;
mod settings_store;

pub use code_store::SqliteCodeStore;
pub use settings_store::SqliteSettingsStore;
