//! In-memory kernel that records every call, for ordering and teardown tests

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::io;

use sockfilter_lib::{
    AttachError, DetachError, InterfaceId, Kernel, LoadError, NetworkInterface, ProgramImage,
    SocketError,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Load(u32),
    Open(u32),
    Attach { socket: u32, program: u32 },
    Detach { socket: u32, program: u32 },
    Close(u32),
    Release(u32),
}

#[derive(Debug)]
pub struct FakeProgram(pub u32);

#[derive(Debug)]
pub struct FakeSocket(pub u32);

pub struct RecordingKernel {
    interfaces: Vec<NetworkInterface>,
    events: RefCell<Vec<Event>>,
    next_fd: Cell<u32>,
    pub reject_open: bool,
    pub reject_attach: bool,
    pub reject_detach: bool,
}

impl RecordingKernel {
    /// A host with `lo` (index 1) and `eth0` (index 2)
    pub fn new() -> Self {
        Self {
            interfaces: vec![
                NetworkInterface { name: "lo".to_string(), index: 1 },
                NetworkInterface { name: "eth0".to_string(), index: 2 },
            ],
            events: RefCell::new(Vec::new()),
            next_fd: Cell::new(3),
            reject_open: false,
            reject_attach: false,
            reject_detach: false,
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub fn count(&self, matches: impl Fn(&Event) -> bool) -> usize {
        self.events.borrow().iter().filter(|e| matches(e)).count()
    }

    fn record(&self, event: Event) {
        self.events.borrow_mut().push(event);
    }

    fn next_fd(&self) -> u32 {
        let fd = self.next_fd.get();
        self.next_fd.set(fd + 1);
        fd
    }
}

impl Kernel for RecordingKernel {
    type Program = FakeProgram;
    type Socket = FakeSocket;

    fn resolve_interface(&self, id: &InterfaceId) -> Result<NetworkInterface, SocketError> {
        self.interfaces
            .iter()
            .find(|iface| match id {
                InterfaceId::Name(name) => &iface.name == name,
                InterfaceId::Index(index) => iface.index == *index,
            })
            .cloned()
            .ok_or_else(|| SocketError::InterfaceNotFound { interface: id.to_string() })
    }

    fn load_program(&self, image: &ProgramImage) -> Result<FakeProgram, LoadError> {
        image.read()?;
        if let Some(name) = image.program_name() {
            if name != "socket_handler" {
                return Err(LoadError::ProgramNotFound(name.to_string()));
            }
        }
        let fd = self.next_fd();
        self.record(Event::Load(fd));
        Ok(FakeProgram(fd))
    }

    fn open_socket(&self, _interface: &NetworkInterface) -> Result<FakeSocket, SocketError> {
        if self.reject_open {
            return Err(SocketError::Open(io::Error::from_raw_os_error(libc::EPERM)));
        }
        let fd = self.next_fd();
        self.record(Event::Open(fd));
        Ok(FakeSocket(fd))
    }

    fn attach_filter(&self, socket: &FakeSocket, program: &FakeProgram) -> Result<(), AttachError> {
        if self.reject_attach {
            return Err(AttachError::Rejected(io::Error::from_raw_os_error(libc::EINVAL)));
        }
        self.record(Event::Attach { socket: socket.0, program: program.0 });
        Ok(())
    }

    fn detach_filter(&self, socket: &FakeSocket, program: &FakeProgram) -> Result<(), DetachError> {
        self.record(Event::Detach { socket: socket.0, program: program.0 });
        if self.reject_detach {
            return Err(DetachError::Rejected(io::Error::from_raw_os_error(libc::EINVAL)));
        }
        Ok(())
    }

    fn close_socket(&self, socket: FakeSocket) {
        self.record(Event::Close(socket.0));
    }

    fn release_program(&self, program: FakeProgram) {
        self.record(Event::Release(program.0));
    }
}

/// A well-formed image as far as the recording kernel is concerned
pub fn good_image() -> ProgramImage {
    ProgramImage::new(b"\x7fELF\x02\x01\x01\x00".to_vec(), Some("socket_handler".to_string()))
}

