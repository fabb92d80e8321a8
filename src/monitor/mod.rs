pub mod domain;
pub mod presale;

pub use domain::Monitor;
pub use presale::PresaleMonitor;
