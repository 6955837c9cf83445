pub mod config;
pub mod db;
pub mod error;
pub mod orchestration;
pub mod pool_control;
pub mod server;
pub mod vault;

pub use error::OrchestrationError;
pub use vault::SecretVault;
