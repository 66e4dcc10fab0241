mod loader;
mod types;

pub use loader::{load_from_path, validate};
pub use types::{Config, LoggingConfig, ProgramConfig};
