//! System control register bank.

use std::sync::Arc;

use crate::mmio::{DevMem, MmioRegion};
use crate::regmap;
use crate::error::{Result, ShimError};

/// 17-bit buffer reset masks: bit b clears board b's FIFOs, bit 16 the
/// trigger FIFO.
pub const BUF_RESET_MASK: u32 = 0x1_FFFF;

pub struct SysCtrl {
    regs: Arc<MmioRegion>,
}

impl SysCtrl {
    pub fn map(dev: &DevMem) -> Result<SysCtrl> {
        Ok(SysCtrl { regs: MmioRegion::map(dev, regmap::SYS_CTRL_BASE, regmap::SYS_CTRL_WORDS)? })
    }

    pub fn anon() -> SysCtrl { SysCtrl { regs: MmioRegion::anon(regmap::SYS_CTRL_WORDS) } }

    pub fn turn_on(&self) {
        log::info!("turning the system on");
        self.regs.write(regmap::SYSTEM_ENABLE, 1);
    }

    pub fn turn_off(&self) {
        log::info!("turning the system off");
        self.regs.write(regmap::SYSTEM_ENABLE, 0);
    }

    pub fn set_boot_test_skip(&self, value: u16) {
        log::debug!("boot_test_skip set to 0x{:04x}", value);
        self.regs.write(regmap::BOOT_TEST_SKIP, value as u32);
    }

    /// Reset the command side of the masked FIFOs. The fabric exposes one
    /// buffer-reset register for both queue directions of each board.
    pub fn set_cmd_buf_reset(&self, mask: u32) -> Result<()> {
        self.write_buf_reset("command", mask)
    }

    /// Reset the data side of the masked FIFOs.
    pub fn set_data_buf_reset(&self, mask: u32) -> Result<()> {
        self.write_buf_reset("data", mask)
    }

    fn write_buf_reset(&self, side: &'static str, mask: u32) -> Result<()> {
        if mask > BUF_RESET_MASK {
            return Err(ShimError::ValueOutOfRange {
                field: "buffer reset mask",
                value: mask,
                min: 0,
                max: BUF_RESET_MASK,
            });
        }
        log::debug!("{} buffer reset mask set to 0x{:05x}", side, mask);
        self.regs.write(regmap::BUFFER_RESET, mask);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buf_reset_rejects_wide_mask() {
        let ctrl = SysCtrl::anon();
        assert!(ctrl.set_cmd_buf_reset(0x1_FFFF).is_ok());
        assert!(ctrl.set_cmd_buf_reset(0x2_0000).is_err());
        assert!(ctrl.set_data_buf_reset(0x2_0000).is_err());
    }

    #[test]
    fn enable_writes_zero_and_one() {
        let ctrl = SysCtrl::anon();
        ctrl.turn_on();
        assert_eq!(ctrl.regs.read(regmap::SYSTEM_ENABLE), 1);
        ctrl.turn_off();
        assert_eq!(ctrl.regs.read(regmap::SYSTEM_ENABLE), 0);
    }

    #[test]
    fn boot_test_skip_zero_extends() {
        let ctrl = SysCtrl::anon();
        ctrl.set_boot_test_skip(0xBEEF);
        assert_eq!(ctrl.regs.read(regmap::BOOT_TEST_SKIP), 0x0000_BEEF);
    }
}
