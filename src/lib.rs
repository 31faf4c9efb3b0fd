pub mod api;
pub mod config;
pub mod editing;
pub mod files;
pub mod models;
pub mod store;
pub mod transport;
mod utils;

pub const TEAMS_FILE: &str = "teams.json";
pub const MATCHES_FILE: &str = "matches.json";

pub use api::{build_router, AppState};
pub use config::ServerConfig;
pub use store::DataStore;
