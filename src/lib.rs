pub mod audio;
pub mod config;
pub mod error;
pub mod retry;
pub mod services;
pub mod session;
pub mod simulation;
pub mod telemetry;

pub use config::ServiceConfig;
pub use error::{ErrorKind, ServiceError};
pub use retry::RetryPolicy;
pub use session::{CompletedTurn, Notice, PendingTurn, Session, TurnOutcome};
