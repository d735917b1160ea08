//! CLI command implementations

mod check;
mod config;
mod query;
mod serve;

pub use check::cmd_check;
pub use config::{cmd_config_init, cmd_config_show};
pub use query::cmd_query;
pub use serve::cmd_serve;
