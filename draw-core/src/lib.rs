pub mod lifecycle;
pub mod lifecycle_events;
pub mod normalizer;
pub mod resolver;
pub mod session;
pub mod timeout;

// Re-export main components
pub use lifecycle::*;
pub use lifecycle_events::*;
pub use normalizer::*;
pub use resolver::*;
pub use session::*;
pub use timeout::*;
