//! FIFO windows.
//!
//! Each fabric FIFO appears as a single 32-bit word: a store pushes, a load
//! pops. Neither operation is gated here; callers consult the matching
//! status word first (see `Shim`'s checked operations and the streaming
//! workers' backpressure loops).

use std::sync::Arc;

use crate::mmio::{DevMem, MmioRegion};
use crate::regmap;
use crate::error::Result;

pub struct FifoPort {
    regs: Arc<MmioRegion>,
}

impl FifoPort {
    pub fn map(dev: &DevMem, base: u32) -> Result<FifoPort> {
        Ok(FifoPort { regs: MmioRegion::map(dev, base, regmap::FIFO_WORDS as usize)? })
    }

    pub fn anon() -> FifoPort { FifoPort { regs: MmioRegion::anon(regmap::FIFO_WORDS as usize) } }

    /// Push one word. Precondition: at least one free slot.
    #[inline]
    pub(crate) fn push(&self, word: u32) { self.regs.write(0, word) }

    /// Pop one word. Precondition: the FIFO is not empty.
    #[inline]
    pub(crate) fn pop(&self) -> u32 { self.regs.read(0) }
}
