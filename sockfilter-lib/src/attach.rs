use tracing::{info, warn};

use crate::error::{AttachError, DetachError};
use crate::kernel::Kernel;
use crate::loader::ProgramGuard;
use crate::socket::SocketGuard;

/// Where an [`Attachment`] is in its lifecycle.
///
/// Transitions only run `Unattached -> Attaching -> Attached -> Detaching -> Unattached`;
/// a failed attach goes straight back to `Unattached`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachState {
    Unattached,
    Attaching,
    Attached,
    Detaching,
}

/// The binding between a loaded program and a raw socket.
///
/// It borrows both guards, so neither the socket nor the program can be
/// released while the attachment is alive. Dropping it detaches.
pub struct Attachment<'a, K: Kernel> {
    kernel: &'a K,
    program: &'a ProgramGuard<'a, K>,
    socket: &'a SocketGuard<'a, K>,
    state: AttachState,
}

impl<'a, K: Kernel> Attachment<'a, K> {
    /// Pair a program with a socket without touching the kernel yet
    pub fn new(program: &'a ProgramGuard<'a, K>, socket: &'a SocketGuard<'a, K>) -> Self {
        Self { kernel: program.kernel(), program, socket, state: AttachState::Unattached }
    }

    /// Pair and attach in one step
    pub fn establish(
        program: &'a ProgramGuard<'a, K>,
        socket: &'a SocketGuard<'a, K>,
    ) -> Result<Self, AttachError> {
        let mut attachment = Self::new(program, socket);
        attachment.attach()?;
        Ok(attachment)
    }

    pub fn state(&self) -> AttachState {
        self.state
    }

    pub fn is_attached(&self) -> bool {
        self.state == AttachState::Attached
    }

    /// Issue SO_ATTACH_BPF. Either the filter is active afterwards or the
    /// state is back to `Unattached`.
    pub fn attach(&mut self) -> Result<(), AttachError> {
        if self.state != AttachState::Unattached {
            return Err(AttachError::AlreadyAttached);
        }
        let program = self.program.get().ok_or(AttachError::ProgramReleased)?;
        let socket = self.socket.get().ok_or(AttachError::SocketClosed)?;

        self.state = AttachState::Attaching;
        match self.kernel.attach_filter(socket, program) {
            Ok(()) => {
                self.state = AttachState::Attached;
                info!(
                    iface = %self.socket.interface().name,
                    index = self.socket.interface().index,
                    "attached socket program to iface"
                );
                Ok(())
            }
            Err(err) => {
                self.state = AttachState::Unattached;
                Err(err)
            }
        }
    }

    /// Issue SO_DETACH_BPF. A no-op unless currently attached.
    pub fn detach(&mut self) -> Result<(), DetachError> {
        if self.state != AttachState::Attached {
            return Ok(());
        }
        self.state = AttachState::Detaching;
        let result = match (self.program.get(), self.socket.get()) {
            (None, _) => Err(DetachError::ProgramReleased),
            (_, None) => Err(DetachError::SocketClosed),
            (Some(program), Some(socket)) => self.kernel.detach_filter(socket, program),
        };
        self.state = AttachState::Unattached;
        if result.is_ok() {
            info!(iface = %self.socket.interface().name, "socket program detached");
        }
        result
    }
}

impl<K: Kernel> Drop for Attachment<'_, K> {
    fn drop(&mut self) {
        if let Err(err) = self.detach() {
            warn!(%err, "failed to detach socket program, continuing teardown");
        }
    }
}
