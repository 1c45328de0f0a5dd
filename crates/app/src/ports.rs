//! Port definitions: traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the core and the adapter layer
//! can depend on them without creating circular dependencies.

pub mod discovery;
pub mod encoder;
pub mod transport;

pub use discovery::Discovery;
pub use encoder::{EncodeError, EventEncoder, JsonEncoder};
pub use transport::{ControlFrame, Transport, TransportError, TransportReceiver, TransportSender};
