pub mod draw;
pub mod errors;
pub mod raffle;

// Re-export all types
pub use draw::*;
pub use errors::*;
pub use raffle::*;
