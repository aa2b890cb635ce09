pub mod configuration;
pub use configuration::Config;

pub mod error_handling;

pub mod classifier;
pub use classifier::{AttackCategory, Classifier, Severity};

pub mod storage;
pub use storage::store::Store;

pub mod protocol;
pub use protocol::methods::MethodRegistry;

pub mod gateway;
pub use gateway::registry::ConnectionRegistry;

pub mod web_interface;

pub mod controller;
pub use controller::Controller;
