pub mod config;
pub mod coordinator;
pub mod emergency;
pub mod error;
pub mod events;
pub mod io;
pub mod paths;
pub mod session;
pub mod show_order;
pub mod store;
pub mod types;

pub use error::{ErrorCode, Result, ShowError};
