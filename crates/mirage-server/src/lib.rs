//! # mirage-server
//!
//! HTTP surface for Mirage. There are no fixed routes besides `GET /docs`:
//! every request is matched against the endpoint registry, its inputs are
//! merged into one object, and the orchestrator produces the JSON body.

pub mod docs;
pub mod error;
pub mod handler;
pub mod normalize;
pub mod routing;
pub mod server;
pub mod state;

pub use docs::render_docs;
pub use error::ServerError;
pub use routing::{PathPattern, RouteMatch, RouteMatcher};
pub use server::{MirageServer, bind_first_free, create_router};
pub use state::AppState;
