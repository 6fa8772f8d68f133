pub mod error;
pub mod config;
pub mod storage;
pub mod client;
pub mod identity;
pub mod navigation;
pub mod console;
pub mod cli;

pub use console::{ConsoleClient, ConsoleSession};
pub use error::{ApiError, ApiResult};
