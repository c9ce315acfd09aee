//! Kernel routines: `upload`, `download`, `upcode`, `downcode`, and the
//! command-emission state machine shared by all four.

pub mod decode;
pub mod dispatch;
pub mod downcode;
pub mod ports;
pub mod state_machine;
pub mod upcode;
pub mod upload;

pub use decode::{DecodePlan, NodeCommand};
pub use dispatch::Dispatcher;
pub use downcode::DowncodePlan;
pub use state_machine::{StripeOutcome, StripeState};
pub use upcode::UpcodePlan;
pub use upload::UploadReport;
