pub mod app;
pub mod config;
pub mod logging;
pub mod shutdown;

pub use app::SniperApp;
pub use config::Config;
pub use shutdown::ShutdownSignal;
