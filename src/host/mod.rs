//! Host-facing contract and bridge for native widget shells.

pub mod channel;
pub mod contract;
pub mod stdio;
pub mod surface;

pub use channel::{HostCommandClient, HostCommandServer, command_channel_with_events};
pub use contract::{CommandEnvelope, CommandName, EventEnvelope, ResponseEnvelope};
pub use surface::{EventRenderer, event_targets};
