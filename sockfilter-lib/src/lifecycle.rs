use std::future::Future;
use std::io;

use tokio::signal::unix::{signal, Signal, SignalKind};
use tracing::{debug, info, warn};

use crate::attach::Attachment;
use crate::error::Result;
use crate::kernel::{InterfaceId, Kernel, ProgramImage};
use crate::loader::ProgramGuard;
use crate::socket::SocketGuard;

/// SIGINT / SIGTERM listener. Install it before setup so a signal that
/// arrives mid-setup is not lost.
pub struct ShutdownSignal {
    sigint: Signal,
    sigterm: Signal,
}

impl ShutdownSignal {
    /// Must be called from within a tokio runtime
    pub fn install() -> io::Result<Self> {
        let sigint = signal(SignalKind::interrupt())?;
        let sigterm = signal(SignalKind::terminate())?;
        Ok(Self { sigint, sigterm })
    }

    /// Suspend until the first termination signal
    pub async fn recv(mut self) {
        tokio::select! {
            _ = self.sigint.recv() => info!("received SIGINT, removing the program"),
            _ = self.sigterm.recv() => info!("received SIGTERM, removing the program"),
        }
    }
}

/// Load, open, attach, then hold everything until `shutdown` resolves.
///
/// Resources are guards declared in acquisition order, so every exit path
/// (including a failure halfway through setup) unwinds them in reverse:
/// detach, close the socket, release the program.
pub async fn run<K, F>(kernel: &K, interface: &InterfaceId, image: &ProgramImage, shutdown: F) -> Result<()>
where
    K: Kernel,
    F: Future<Output = ()>,
{
    let iface = kernel.resolve_interface(interface)?;
    debug!(%iface, "network interface resolved");

    let program = ProgramGuard::load(kernel, image)?;
    let socket = SocketGuard::open_on(kernel, &iface)?;
    let mut attachment = Attachment::establish(&program, &socket)?;

    info!("press Ctrl-C to exit and remove the program");
    shutdown.await;

    if let Err(err) = attachment.detach() {
        warn!(%err, "failed to detach socket program, continuing teardown");
    }
    drop(attachment);
    drop(socket);
    drop(program);

    info!(%iface, "all resources released");
    Ok(())
}
