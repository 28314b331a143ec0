pub mod admin;
pub mod auth;
pub mod channels;
pub mod dms;
pub mod error;
pub mod extract;
pub mod messages;
pub mod middleware;
pub mod notifications;
pub mod reactions;
pub mod routes;
pub mod scheduler;
pub mod search;
pub mod standups;
pub mod users;
pub mod validation;

pub use auth::{AppState, AppStateInner};
pub use routes::router;
