use std::io;
use std::path::PathBuf;

use aya::programs::ProgramError;
use thiserror::Error;

/// Errors raised while loading a compiled program image into the kernel
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read program image {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("program image is empty")]
    EmptyImage,

    #[error("program image is not an ELF object")]
    NotElf,

    #[error("failed to parse BPF object: {0}")]
    Object(#[source] aya::EbpfError),

    #[error("socket filter program '{0}' not found in BPF object")]
    ProgramNotFound(String),

    #[error("BPF object contains no socket filter program")]
    NoSocketFilter,

    #[error("BPF object contains {0} socket filter programs, a program name is required")]
    AmbiguousProgram(usize),

    #[error("BPF program '{name}' is not a socket filter: {source}")]
    ProgramType {
        name: String,
        #[source]
        source: ProgramError,
    },

    #[error("kernel rejected program '{name}': {source}")]
    Rejected {
        name: String,
        #[source]
        source: ProgramError,
    },
}

/// Errors raised while resolving an interface or opening the raw socket
#[derive(Error, Debug)]
pub enum SocketError {
    #[error("network interface '{interface}' not found")]
    InterfaceNotFound { interface: String },

    #[error("failed to open raw packet socket: {0}")]
    Open(#[source] io::Error),

    #[error("failed to bind raw socket to interface '{interface}' (index {index}): {source}")]
    Bind {
        interface: String,
        index: u32,
        #[source]
        source: io::Error,
    },
}

/// Errors raised by SO_ATTACH_BPF
#[derive(Error, Debug)]
pub enum AttachError {
    #[error("program handle has already been released")]
    ProgramReleased,

    #[error("raw socket has already been closed")]
    SocketClosed,

    #[error("a filter is already attached to this socket")]
    AlreadyAttached,

    #[error("loaded program has no file descriptor: {0}")]
    ProgramFd(#[source] ProgramError),

    #[error("kernel rejected SO_ATTACH_BPF: {0}")]
    Rejected(#[source] io::Error),
}

/// Errors raised by SO_DETACH_BPF. Never fatal: teardown logs them and carries on.
#[derive(Error, Debug)]
pub enum DetachError {
    #[error("program handle was released before detaching")]
    ProgramReleased,

    #[error("raw socket was closed before detaching")]
    SocketClosed,

    #[error("kernel rejected SO_DETACH_BPF: {0}")]
    Rejected(#[source] io::Error),
}

/// Errors that abort the sockfilter startup sequence
#[derive(Error, Debug)]
pub enum SockFilterError {
    #[error("usage: {0}")]
    Usage(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("load program: {0}")]
    Load(#[from] LoadError),

    #[error("open raw socket: {0}")]
    Socket(#[from] SocketError),

    #[error("attach filter: {0}")]
    Attach(#[from] AttachError),

    #[error("install signal handlers: {0}")]
    Signal(#[source] io::Error),
}

pub type Result<T> = std::result::Result<T, SockFilterError>;
