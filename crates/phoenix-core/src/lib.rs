//! Host-side control plane core for a 16-lane PCIe Gen6 retimer chip.
//!
//! Layered leaves-first, matching the component boundaries external
//! surfaces (web dashboard, HTTP API, CLI) are expected to consume through:
//! [`transport`] (byte-level duplex to the physical adapter), [`framing`]
//! (SMBus command/PEC framing), [`register_access`] (typed 16/32-bit
//! register operations), [`regmap`] (the static register/bitfield catalog),
//! [`device`] (the per-device façade), [`discovery`] (bus probing), and
//! [`registry`] (the process-wide handle table).

pub mod config;
pub mod device;
pub mod discovery;
pub mod error;
pub mod eye;
pub mod framing;
pub mod identity;
pub mod pec;
pub mod prbs;
pub mod regmap;
pub mod register_access;
pub mod registry;
pub mod status;
pub mod transport;

pub use device::Device;
pub use error::{ErrorKind, PhoenixError, Result};
pub use identity::DeviceIdentity;
pub use registry::DeviceRegistry;
pub use transport::{Transport, TransportConfig};
