pub mod settings;
pub mod settings_io;

pub use settings::{AgentSettings, NegotiationSettings, RetrySettings, Settings};
pub use settings_io::{load_settings, save_settings, settings_path};
