pub mod config;
pub mod errors;
pub mod init;
pub mod input;
pub mod logging;
pub mod orchestrator;
pub mod remarker_config;
pub mod store;
pub mod ui;
pub mod worker;
