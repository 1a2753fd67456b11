pub mod clock;
pub mod config;
pub mod errors;
pub mod filters;
pub mod lifecycle;
pub mod models;
pub mod repo;
pub mod scheduler;
pub mod session;
pub mod stats;

pub use clock::*;
pub use config::*;
pub use errors::*;
pub use filters::*;
pub use lifecycle::*;
pub use models::*;
pub use repo::*;
pub use scheduler::{DueDate, SchedulingPolicy};
pub use session::*;
pub use stats::*;
