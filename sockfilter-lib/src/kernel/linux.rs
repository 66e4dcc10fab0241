use std::io;
use std::os::fd::{AsFd, BorrowedFd};

use aya::programs::{Program, SocketFilter};
use aya::Ebpf;
use socket2::{Domain, Protocol, Socket, Type};
use tracing::debug;

use super::sys;
use super::{InterfaceId, Kernel, NetworkInterface, ProgramImage};
use crate::error::{AttachError, DetachError, LoadError, SocketError};
use crate::socket::protocol_all;

/// The running Linux kernel, reached through aya (program loading), socket2
/// (socket creation) and libc (everything else).
#[derive(Debug, Default, Clone, Copy)]
pub struct LinuxKernel;

/// Loaded eBPF object: the socket filter program and every map it references.
/// Dropping it closes all of their file descriptors.
pub struct LoadedProgram {
    ebpf: Ebpf,
    name: String,
}

impl LoadedProgram {
    fn filter(&self) -> Result<&SocketFilter, AttachError> {
        let program = self.ebpf.program(&self.name).ok_or(AttachError::ProgramReleased)?;
        <&SocketFilter>::try_from(program).map_err(AttachError::ProgramFd)
    }
}

/// `AF_PACKET` / `SOCK_RAW` socket bound to one interface
pub struct PacketSocket {
    socket: Socket,
}

impl AsFd for PacketSocket {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.socket.as_fd()
    }
}

impl Kernel for LinuxKernel {
    type Program = LoadedProgram;
    type Socket = PacketSocket;

    fn resolve_interface(&self, id: &InterfaceId) -> Result<NetworkInterface, SocketError> {
        resolve_with(id, sys::if_nametoindex, sys::if_indextoname)
    }

    fn load_program(&self, image: &ProgramImage) -> Result<LoadedProgram, LoadError> {
        let bytes = image.read()?;

        if let Err(e) = sys::raise_memlock_limit() {
            debug!(error = %e, "remove limit on locked memory failed");
        }

        let mut ebpf = Ebpf::load(&bytes).map_err(LoadError::Object)?;

        let name = match image.program_name() {
            Some(name) => name.to_string(),
            None => sole_socket_filter(&ebpf)?,
        };

        let program: &mut SocketFilter = ebpf
            .program_mut(&name)
            .ok_or_else(|| LoadError::ProgramNotFound(name.clone()))?
            .try_into()
            .map_err(|source| LoadError::ProgramType { name: name.clone(), source })?;

        program
            .load()
            .map_err(|source| LoadError::Rejected { name: name.clone(), source })?;

        debug!(program = %name, "socket filter program loaded");
        Ok(LoadedProgram { ebpf, name })
    }

    fn open_socket(&self, interface: &NetworkInterface) -> Result<PacketSocket, SocketError> {
        let protocol = protocol_all();
        let socket = Socket::new(
            Domain::PACKET,
            Type::RAW,
            Some(Protocol::from(i32::from(protocol))),
        )
        .map_err(SocketError::Open)?;

        // On failure `socket` is dropped here, closing the descriptor.
        sys::bind_packet_socket(socket.as_fd(), protocol, interface.index).map_err(|source| {
            SocketError::Bind { interface: interface.name.clone(), index: interface.index, source }
        })?;

        debug!(interface = %interface, "raw packet socket opened");
        Ok(PacketSocket { socket })
    }

    fn attach_filter(&self, socket: &PacketSocket, program: &LoadedProgram) -> Result<(), AttachError> {
        let prog_fd = program.filter()?.fd().map_err(AttachError::ProgramFd)?;
        sys::set_bpf_option(socket.as_fd(), sys::SO_ATTACH_BPF, prog_fd.as_fd())
            .map_err(AttachError::Rejected)
    }

    fn detach_filter(&self, socket: &PacketSocket, program: &LoadedProgram) -> Result<(), DetachError> {
        let prog_fd = program
            .filter()
            .and_then(|filter| filter.fd().map_err(AttachError::ProgramFd))
            .map_err(|_| DetachError::ProgramReleased)?;
        sys::set_bpf_option(socket.as_fd(), sys::SO_DETACH_BPF, prog_fd.as_fd())
            .map_err(DetachError::Rejected)
    }
}

/// Resolve `id` with the given name and index lookups.
///
/// Linux accepts all-digit interface names, so an index is first tried as a
/// name and only then as an index.
fn resolve_with<N, I>(id: &InterfaceId, by_name: N, by_index: I) -> Result<NetworkInterface, SocketError>
where
    N: Fn(&str) -> io::Result<u32>,
    I: Fn(u32) -> io::Result<String>,
{
    let not_found = || SocketError::InterfaceNotFound { interface: id.to_string() };
    match id {
        InterfaceId::Name(name) => {
            let index = by_name(name).map_err(|e| {
                debug!(interface = %name, error = %e, "if_nametoindex failed");
                not_found()
            })?;
            Ok(NetworkInterface { name: name.clone(), index })
        }
        InterfaceId::Index(index) => {
            let numeric = index.to_string();
            if let Ok(named) = by_name(&numeric) {
                debug!(interface = %numeric, index = named, "numeric identifier matched an interface name");
                return Ok(NetworkInterface { name: numeric, index: named });
            }
            let name = by_index(*index).map_err(|e| {
                debug!(index, error = %e, "if_indextoname failed");
                not_found()
            })?;
            Ok(NetworkInterface { name, index: *index })
        }
    }
}

fn sole_socket_filter(ebpf: &Ebpf) -> Result<String, LoadError> {
    let filters: Vec<&str> = ebpf
        .programs()
        .filter(|(_, program)| matches!(program, Program::SocketFilter(_)))
        .map(|(name, _)| name)
        .collect();

    match filters.as_slice() {
        [] => Err(LoadError::NoSocketFilter),
        [name] => Ok((*name).to_string()),
        many => Err(LoadError::AmbiguousProgram(many.len())),
    }
}
