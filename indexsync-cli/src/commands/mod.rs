pub mod init;
pub mod provision;
pub mod search;
pub mod status;

pub use init::run_init_config;
pub use provision::run_provision;
pub use search::run_search;
pub use status::run_status;
