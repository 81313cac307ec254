//! Stream I/O layer (spec §4.5, §6 wire format).

pub mod compress;
pub mod descriptor;
pub mod framing;
pub mod io;
pub mod oob;

pub use descriptor::{PacketDescriptor, Plane, PlaneKind, PropertyValue, StreamDescriptor};
pub use io::{Handlers, StreamReader, StreamWriter};
pub use oob::Oob;
