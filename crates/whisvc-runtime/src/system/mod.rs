//! Host probing: accelerator capability, port occupancy, processes, privilege.

mod gpu;
mod host;
mod ports;
mod processes;

pub use gpu::{CapabilityDetector, CapabilityError, parse_query_line};
pub use host::SystemHostProbe;
pub use ports::{PortResolution, PortResolver};
pub use processes::{SysinfoProcessTable, terminate_under};
