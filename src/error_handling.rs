pub mod types;

pub use types::{ConfigError, ControllerError, StoreError};
