pub mod config;
pub mod blockchain;
pub mod governance;
pub mod api;
pub mod utils;

pub use config::Config;
pub use utils::errors::Result;

use governance::GovernanceAdapter;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub adapter: Arc<GovernanceAdapter>,
}
