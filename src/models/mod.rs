pub mod session;

pub use session::{elapsed_seconds, FastSession};
