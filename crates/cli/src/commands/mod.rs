pub mod config_cmd;
pub mod route;
pub mod rules_cmd;
