pub mod forward;
pub mod middleware;
pub mod router;

pub use router::{create_app, AppState};
