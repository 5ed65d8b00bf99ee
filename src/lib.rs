pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod responses;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;

pub use state::AppState;
