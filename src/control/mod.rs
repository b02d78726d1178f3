pub mod listener;
pub mod router;

pub use listener::serve;
pub use router::{CommandRouter, OperatorCommand};
