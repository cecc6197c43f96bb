pub mod errors;
mod registry;
mod router;

pub use router::{AppState, create_router};
