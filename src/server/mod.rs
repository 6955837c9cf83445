pub mod guards;
pub mod router;
mod routes;

pub use router::{PodbayState, podbay_router};
