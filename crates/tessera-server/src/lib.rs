pub mod config;
pub mod observability;
pub mod server;

pub use config::AppConfig;
pub use observability::init_tracing;
pub use server::{ServerBuilder, TesseraServer, build_app};
