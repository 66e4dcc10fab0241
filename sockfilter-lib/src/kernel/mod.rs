//! The kernel seam: every system call sockfilter issues goes through [`Kernel`].
//!
//! [`LinuxKernel`] talks to the running kernel through aya, socket2 and libc.
//! Tests substitute an in-memory implementation that records the call order.

mod linux;
mod sys;

use std::borrow::Cow;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AttachError, DetachError, LoadError, SockFilterError, SocketError};

pub use linux::{LinuxKernel, LoadedProgram, PacketSocket};
pub use sys::{SO_ATTACH_BPF, SO_DETACH_BPF};

const ELF_MAGIC: &[u8; 4] = b"\x7fELF";

/// Kernel operations behind the load / open / attach / detach lifecycle.
///
/// `Program` and `Socket` are owned kernel objects: dropping them (or passing
/// them to `release_program` / `close_socket`) closes the descriptors.
pub trait Kernel {
    type Program;
    type Socket;

    fn resolve_interface(&self, id: &InterfaceId) -> Result<NetworkInterface, SocketError>;

    fn load_program(&self, image: &ProgramImage) -> Result<Self::Program, LoadError>;

    fn open_socket(&self, interface: &NetworkInterface) -> Result<Self::Socket, SocketError>;

    fn attach_filter(
        &self,
        socket: &Self::Socket,
        program: &Self::Program,
    ) -> Result<(), AttachError>;

    fn detach_filter(
        &self,
        socket: &Self::Socket,
        program: &Self::Program,
    ) -> Result<(), DetachError>;

    fn close_socket(&self, socket: Self::Socket) {
        drop(socket);
    }

    fn release_program(&self, program: Self::Program) {
        drop(program);
    }
}

/// Interface identifier as given on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterfaceId {
    Name(String),
    Index(u32),
}

impl InterfaceId {
    /// Parse a command-line identifier: all-digit input is an interface index,
    /// anything else an interface name.
    pub fn parse(raw: &str) -> Result<Self, SockFilterError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(SockFilterError::Usage("network interface must not be empty".to_string()));
        }
        if raw.bytes().all(|b| b.is_ascii_digit()) {
            return raw.parse::<u32>().map(InterfaceId::Index).map_err(|e| {
                SockFilterError::Usage(format!("invalid interface index '{raw}': {e}"))
            });
        }
        if raw.len() >= libc::IF_NAMESIZE {
            return Err(SockFilterError::Usage(format!(
                "interface name '{raw}' is longer than {} bytes",
                libc::IF_NAMESIZE - 1
            )));
        }
        Ok(InterfaceId::Name(raw.to_string()))
    }
}

impl fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterfaceId::Name(name) => f.write_str(name),
            InterfaceId::Index(index) => write!(f, "#{index}"),
        }
    }
}

/// A network interface resolved to its kernel index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkInterface {
    pub name: String,
    pub index: u32,
}

impl fmt::Display for NetworkInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (index {})", self.name, self.index)
    }
}

/// A compiled program image, treated as opaque bytes plus the name of the
/// socket filter program inside it.
///
/// Images built with [`ProgramImage::from_path`] are read lazily, as part of
/// loading, so a missing file surfaces as a [`LoadError`] at the load step.
#[derive(Debug, Clone)]
pub struct ProgramImage {
    source: ImageSource,
    program: Option<String>,
}

#[derive(Debug, Clone)]
enum ImageSource {
    Bytes(Vec<u8>),
    Path(PathBuf),
}

impl ProgramImage {
    pub fn new(bytes: Vec<u8>, program: Option<String>) -> Self {
        Self { source: ImageSource::Bytes(bytes), program }
    }

    pub fn from_path<P: AsRef<Path>>(path: P, program: Option<String>) -> Self {
        Self { source: ImageSource::Path(path.as_ref().to_path_buf()), program }
    }

    /// Name of the program to load; `None` selects the only socket filter in the object
    pub fn program_name(&self) -> Option<&str> {
        self.program.as_deref()
    }

    /// Image bytes, read from disk if needed. Images that cannot possibly be
    /// BPF objects are rejected before the kernel is involved.
    pub fn read(&self) -> Result<Cow<'_, [u8]>, LoadError> {
        let bytes = match &self.source {
            ImageSource::Bytes(bytes) => Cow::Borrowed(bytes.as_slice()),
            ImageSource::Path(path) => Cow::Owned(
                fs::read(path).map_err(|source| LoadError::Read { path: path.clone(), source })?,
            ),
        };
        check_format(&bytes)?;
        Ok(bytes)
    }
}

fn check_format(bytes: &[u8]) -> Result<(), LoadError> {
    if bytes.is_empty() {
        return Err(LoadError::EmptyImage);
    }
    if !bytes.starts_with(ELF_MAGIC) {
        return Err(LoadError::NotElf);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_interface_name() {
        assert!(matches!(InterfaceId::parse("eth0"), Ok(InterfaceId::Name(n)) if n == "eth0"));
        assert!(matches!(InterfaceId::parse(" enp0s1 "), Ok(InterfaceId::Name(n)) if n == "enp0s1"));
    }

    #[test]
    fn test_parse_interface_index() {
        assert!(matches!(InterfaceId::parse("3"), Ok(InterfaceId::Index(3))));
    }

    #[test]
    fn test_parse_rejects_empty_identifier() {
        assert!(matches!(InterfaceId::parse(""), Err(SockFilterError::Usage(_))));
        assert!(matches!(InterfaceId::parse("   "), Err(SockFilterError::Usage(_))));
    }

    #[test]
    fn test_parse_rejects_overlong_name() {
        let name = "x".repeat(libc::IF_NAMESIZE);
        assert!(matches!(InterfaceId::parse(&name), Err(SockFilterError::Usage(_))));
    }

    #[test]
    fn test_parse_rejects_index_overflow() {
        assert!(matches!(InterfaceId::parse("99999999999"), Err(SockFilterError::Usage(_))));
    }

    #[test]
    fn test_read_checks_format() {
        assert!(matches!(ProgramImage::new(vec![], None).read(), Err(LoadError::EmptyImage)));
        assert!(matches!(
            ProgramImage::new(b"not a program".to_vec(), None).read(),
            Err(LoadError::NotElf)
        ));
        assert!(ProgramImage::new(b"\x7fELF\x02\x01".to_vec(), None).read().is_ok());
    }

    #[test]
    fn test_from_path_defers_reading() {
        let image = ProgramImage::from_path("/nonexistent/sockfilter/socket_filter.o", None);
        assert!(matches!(image.read(), Err(LoadError::Read { .. })));
    }

    #[test]
    fn test_from_path_reads_file() -> Result<(), Box<dyn std::error::Error>> {
        let dir = std::env::temp_dir().join(format!("sockfilter-image-{}", std::process::id()));
        fs::create_dir_all(&dir)?;
        let path = dir.join("filter.o");
        fs::write(&path, b"\x7fELF\x02\x01\x01")?;

        let image = ProgramImage::from_path(&path, Some("socket_handler".to_string()));
        let bytes = image.read()?.into_owned();
        let _ = fs::remove_dir_all(&dir);

        assert_eq!(bytes, b"\x7fELF\x02\x01\x01");
        assert_eq!(image.program_name(), Some("socket_handler"));
        Ok(())
    }
}
