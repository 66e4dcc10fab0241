// Raw packet sockets and SO_ATTACH_BPF are Linux-only. This crate does not compile for other targets.
#![cfg(target_os = "linux")]
// Unsafe is required in one narrow, documented site:
//   - kernel/sys.rs: libc FFI for interface lookup, sockaddr_ll bind, setsockopt and setrlimit
// All other unsafe is denied.
#![deny(unsafe_code)]

pub mod attach;
pub mod config;
pub mod error;
pub mod kernel;
pub mod lifecycle;
pub mod loader;
pub mod socket;
pub mod telemetry;

pub use attach::{AttachState, Attachment};
pub use config::{load_from_path, Config, LoggingConfig, ProgramConfig};
pub use error::{AttachError, DetachError, LoadError, Result, SockFilterError, SocketError};
pub use kernel::{InterfaceId, Kernel, LinuxKernel, NetworkInterface, ProgramImage};
pub use lifecycle::{run, ShutdownSignal};
pub use loader::ProgramGuard;
pub use socket::{protocol_all, SocketGuard, ETH_P_ALL};
