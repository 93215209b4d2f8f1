//! Admin HTTP module: expiration stats and manual controls.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::AdminAppState;
pub use routes::admin_routes;
