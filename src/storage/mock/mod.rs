//! Mock storage implementations for testing.

mod code_store;
mod settings_store;

pub use code_store::MockCodeStore;
pub use settings_store::MockSettingsStore;
