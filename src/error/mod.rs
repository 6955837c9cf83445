mod orchestration;

pub use orchestration::{ErrorBody, OrchestrationError};
