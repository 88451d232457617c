#![doc = "The `taskdesk` library crate."]
#![doc = ""]
#![doc = "Domain models, storage, authentication guards, the task query engine and the HTTP"]
#![doc = "routes of the TaskDesk service. The binary (`main.rs`) wires them into an Actix"]
#![doc = "server; the integration tests wire them over the in-memory store."]

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod query;
pub mod routes;
pub mod state;
pub mod store;
pub mod users;

pub use crate::error::AppError;
pub use crate::state::AppState;
