//! SPI clock controller interface.
//!
//! Carries the serial clock configuration, the SCK polarity registers and
//! the debug word. The bank forbids read-modify-write, so the polarity
//! "inversions" keep a host-side shadow of the last written value.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::mmio::{DevMem, MmioRegion};
use crate::regmap;
use crate::error::Result;

/// Raw snapshot of the controller's register file, for the debug readout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpiClkDebug {
    pub reset: u32,
    pub status: u32,
    pub cfg0: u32,
    pub cfg1: u32,
    pub phase: u32,
    pub duty: u32,
    pub debug: u32,
    pub mosi_sck_pol: u32,
    pub miso_sck_pol: u32,
    pub enable: u32,
}

pub struct SpiClk {
    regs: Arc<MmioRegion>,
    mosi_pol: AtomicU32,
    miso_pol: AtomicU32,
}

impl SpiClk {
    pub fn map(dev: &DevMem) -> Result<SpiClk> {
        Ok(Self::new(MmioRegion::map(dev, regmap::SPI_CLK_BASE, regmap::SPI_CLK_WORDS)?))
    }

    pub fn anon() -> SpiClk { Self::new(MmioRegion::anon(regmap::SPI_CLK_WORDS)) }

    fn new(regs: Arc<MmioRegion>) -> SpiClk {
        SpiClk { regs, mosi_pol: AtomicU32::new(0), miso_pol: AtomicU32::new(0) }
    }

    /// Flip the MOSI SCK polarity and return the new value.
    pub fn invert_mosi_sck(&self) -> u32 {
        let pol = self.mosi_pol.fetch_xor(1, Ordering::SeqCst) ^ 1;
        self.regs.write(regmap::SPI_CLK_MOSI_SCK_POL, pol);
        log::info!("MOSI SCK polarity set to {}", pol);
        pol
    }

    /// Flip the MISO SCK polarity and return the new value.
    pub fn invert_miso_sck(&self) -> u32 {
        let pol = self.miso_pol.fetch_xor(1, Ordering::SeqCst) ^ 1;
        self.regs.write(regmap::SPI_CLK_MISO_SCK_POL, pol);
        log::info!("MISO SCK polarity set to {}", pol);
        pol
    }

    pub fn set_debug(&self, value: u16) {
        log::debug!("debug word set to 0x{:04x}", value);
        self.regs.write(regmap::SPI_CLK_DEBUG, value as u32);
    }

    pub fn debug_registers(&self) -> SpiClkDebug {
        SpiClkDebug {
            reset: self.regs.read(regmap::SPI_CLK_RESET),
            status: self.regs.read(regmap::SPI_CLK_STATUS),
            cfg0: self.regs.read(regmap::SPI_CLK_CFG_0),
            cfg1: self.regs.read(regmap::SPI_CLK_CFG_1),
            phase: self.regs.read(regmap::SPI_CLK_PHASE),
            duty: self.regs.read(regmap::SPI_CLK_DUTY),
            debug: self.regs.read(regmap::SPI_CLK_DEBUG),
            mosi_sck_pol: self.regs.read(regmap::SPI_CLK_MOSI_SCK_POL),
            miso_sck_pol: self.regs.read(regmap::SPI_CLK_MISO_SCK_POL),
            enable: self.regs.read(regmap::SPI_CLK_ENABLE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polarity_toggles_alternate() {
        let clk = SpiClk::anon();
        assert_eq!(clk.invert_mosi_sck(), 1);
        assert_eq!(clk.invert_mosi_sck(), 0);
        assert_eq!(clk.invert_miso_sck(), 1);
        assert_eq!(clk.debug_registers().mosi_sck_pol, 0);
        assert_eq!(clk.debug_registers().miso_sck_pol, 1);
    }

    #[test]
    fn debug_word_round_trips_through_snapshot() {
        let clk = SpiClk::anon();
        clk.set_debug(0x1234);
        assert_eq!(clk.debug_registers().debug, 0x1234);
    }
}
