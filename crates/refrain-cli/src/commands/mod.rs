pub mod config;
pub mod encode;
pub mod search;
pub mod status;

pub use encode::run_encode;
pub use search::run_search;
pub use status::show_status;
