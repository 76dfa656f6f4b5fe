//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module   | Commands handled                      |
//! |----------|---------------------------------------|
//! | `init`   | `Init`                                |
//! | `run`    | `Run`, `Resume`                       |
//! | `state`  | `Status`, `Stop`, `History`, `Reset`  |
//! | `serve`  | `Serve`                               |
//! | `config` | `Config`                              |

pub mod config;
pub mod init;
pub mod run;
pub mod serve;
pub mod state;

pub use config::cmd_config;
pub use init::cmd_init;
pub use run::{RunArgs, cmd_resume, cmd_run};
pub use serve::cmd_serve;
pub use state::{cmd_history, cmd_reset, cmd_status, cmd_stop};
