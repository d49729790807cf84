//! HTTP surface for the tag listing.

mod server;

pub use server::{router, serve, AppState, ServeError};
