pub mod builder;
pub mod clock;
pub mod controller;
pub mod gas;
pub mod state;

pub use builder::{BuiltAttempt, TransactionBuilder};
pub use clock::{Clock, TokioClock};
pub use controller::{AbortReason, ExecutionController, Outcome};
pub use gas::{GasPolicy, GasQuote};
pub use state::ControllerState;
