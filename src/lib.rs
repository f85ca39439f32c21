// Stancecraft - stance and moveset condition compiler for animation replacer configurations
//
// This is the library crate containing the data model, the condition compiler and
// the runtime selection state. The binary crate (main.rs) provides the CLI entry point.

pub mod config;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod state;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use metrics::Metrics;
pub use models::{AnimationLibrary, MovesetModel, UserConfig};
pub use services::{ConditionDocument, ConditionNode, DocumentBuilder};
pub use state::{ActorSource, ComboTracker, ModelChange, MovesetManager, SelectionEvent};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
