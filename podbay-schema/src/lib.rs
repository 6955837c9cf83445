pub mod api_error;
pub mod pod;
pub mod pool;

pub use api_error::PoolApiErrorBody;
pub use pod::{PodDescriptor, PodRepository, UpdateRepositoriesRequest};
pub use pool::{CreatePoolRequest, EnvVar, PoolDescriptor, ProvisionedApiKey};
