pub mod api;
pub mod config;
pub mod engine;
pub mod push;

pub use api::{ApiClient, ApiError};
pub use config::Config;
pub use engine::{DrawEngine, EngineHandle, EngineView};
pub use push::{PushChannel, PushEvent, PushHandler};
