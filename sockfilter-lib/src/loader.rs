use tracing::{debug, info};

use crate::error::LoadError;
use crate::kernel::{Kernel, ProgramImage};

/// Owned handle to a program loaded into the kernel, together with its maps.
///
/// Released exactly once: either by [`ProgramGuard::release`] or on drop.
/// Loading has no attachment side effects.
pub struct ProgramGuard<'k, K: Kernel> {
    kernel: &'k K,
    program: Option<K::Program>,
}

impl<'k, K: Kernel> ProgramGuard<'k, K> {
    pub fn load(kernel: &'k K, image: &ProgramImage) -> Result<Self, LoadError> {
        let program = kernel.load_program(image)?;
        debug!(program = image.program_name().unwrap_or("<sole socket filter>"), "program acquired");
        Ok(Self { kernel, program: Some(program) })
    }

    pub fn get(&self) -> Option<&K::Program> {
        self.program.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.program.is_some()
    }

    /// Release the program and its maps. Calling it again is a no-op.
    pub fn release(&mut self) {
        if let Some(program) = self.program.take() {
            self.kernel.release_program(program);
            info!("socket filter program released");
        }
    }

    pub(crate) fn kernel(&self) -> &'k K {
        self.kernel
    }
}

impl<K: Kernel> Drop for ProgramGuard<'_, K> {
    fn drop(&mut self) {
        self.release();
    }
}
