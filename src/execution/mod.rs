//! Pipeline execution engine

pub mod engine;
pub mod executor;
pub mod retry;

pub use engine::{EventHandler, ExecutionEngine, ExecutionEvent};
pub use executor::{StageExecutor, StageFailure};
pub use retry::RetryPolicy;
