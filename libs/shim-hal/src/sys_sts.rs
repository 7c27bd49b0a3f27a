//! System status register bank: the hardware-manager status word and one
//! status word per FIFO.
//!
//! All words in this bank are read-only to the host. The decoders here are
//! pure; the console renders them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use crate::mmio::{DevMem, MmioRegion};
use crate::regmap;
use crate::error::Result;

/// Decoded view of a FIFO status word: bit 31 flags the FIFO as present in
/// the fabric build, bits 15..0 carry the occupancy in 32-bit words. A zero
/// depth field is the empty sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FifoStatus(u32);

impl FifoStatus {
    const PRESENT: u32 = 1 << 31;
    const WORD_COUNT_MASK: u32 = 0xFFFF;

    pub fn from_raw(raw: u32) -> FifoStatus { FifoStatus(raw) }

    pub fn raw(self) -> u32 { self.0 }

    pub fn present(self) -> bool { self.0 & Self::PRESENT != 0 }

    /// Current occupancy in 32-bit words.
    pub fn word_count(self) -> u32 { self.0 & Self::WORD_COUNT_MASK }

    pub fn is_empty(self) -> bool { self.word_count() == 0 }

    /// Slots a producer may still fill. The hardware reserves one slot, so a
    /// 1024-word FIFO holds at most 1023 words.
    pub fn free_words(self) -> u32 {
        (regmap::FIFO_WORDS - 1).saturating_sub(self.word_count())
    }

    pub fn is_full(self) -> bool { self.free_words() == 0 }
}

/// Hardware-manager state codes, bits 3..0 of the status word.
#[derive(FromPrimitive, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwState {
    Idle = 0,
    Starting = 1,
    Running = 2,
    Halting = 3,
    Halted = 4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HwStatus(u32);

impl HwStatus {
    pub fn from_raw(raw: u32) -> HwStatus { HwStatus(raw) }

    pub fn raw(self) -> u32 { self.0 }

    pub fn state_code(self) -> u8 { (self.0 & 0xF) as u8 }

    pub fn state(self) -> Option<HwState> { HwState::from_u8(self.state_code()) }

    pub fn is_running(self) -> bool { self.state() == Some(HwState::Running) }

    /// Halt/status code reported by the hardware manager, bits 11..4.
    pub fn status_code(self) -> u8 { (self.0 >> 4 & 0xFF) as u8 }

    /// Board index associated with a halt, bits 14..12.
    pub fn halt_board(self) -> u8 { (self.0 >> 12 & 0x7) as u8 }
}

/// Binding over the status bank. Constructed once; accessors are
/// arithmetic-free volatile loads at fixed offsets.
pub struct SysSts {
    regs: Arc<MmioRegion>,
    monitor_running: AtomicBool,
}

impl SysSts {
    pub fn map(dev: &DevMem) -> Result<SysSts> {
        Ok(SysSts {
            regs: MmioRegion::map(dev, regmap::SYS_STS_BASE, regmap::SYS_STS_WORDS)?,
            monitor_running: AtomicBool::new(false),
        })
    }

    pub fn anon() -> SysSts {
        SysSts {
            regs: MmioRegion::anon(regmap::SYS_STS_WORDS),
            monitor_running: AtomicBool::new(false),
        }
    }

    pub fn hw_status(&self) -> HwStatus { HwStatus(self.regs.read(regmap::HW_STATUS)) }

    /// The DAC FIFO is one bidirectional queue pair behind a single window;
    /// both its directions report through this status word.
    pub fn dac_fifo_status(&self, board: usize) -> FifoStatus {
        FifoStatus(self.regs.read(regmap::dac_cmd_fifo_sts(board)))
    }

    pub fn adc_cmd_fifo_status(&self, board: usize) -> FifoStatus {
        FifoStatus(self.regs.read(regmap::adc_cmd_fifo_sts(board)))
    }

    pub fn adc_data_fifo_status(&self, board: usize) -> FifoStatus {
        FifoStatus(self.regs.read(regmap::adc_data_fifo_sts(board)))
    }

    pub fn trig_cmd_fifo_status(&self) -> FifoStatus {
        FifoStatus(self.regs.read(regmap::TRIG_CMD_FIFO_STS))
    }

    pub fn trig_data_fifo_status(&self) -> FifoStatus {
        FifoStatus(self.regs.read(regmap::TRIG_DATA_FIFO_STS))
    }

    /// Start the hardware-manager monitor: a background thread that watches
    /// the status word and logs state transitions. Best-effort; callers treat
    /// a failure as a warning, and a second start is a no-op.
    pub fn start_hw_monitor(&self) -> std::io::Result<()> {
        if self.monitor_running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let regs = Arc::clone(&self.regs);
        let spawned = std::thread::Builder::new().name("hw-monitor".into()).spawn(move || {
            let mut last = HwStatus(regs.read(regmap::HW_STATUS));
            log::info!("hardware monitor started, state {:?}", last.state());
            loop {
                std::thread::sleep(Duration::from_millis(100));
                let now = HwStatus(regs.read(regmap::HW_STATUS));
                if now.state_code() != last.state_code() {
                    log::info!(
                        "hardware manager: {:?} -> {:?} (status code 0x{:02x}, board {})",
                        last.state(),
                        now.state(),
                        now.status_code(),
                        now.halt_board()
                    );
                }
                last = now;
            }
        });
        match spawned {
            Ok(_) => Ok(()),
            Err(e) => {
                self.monitor_running.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_status_predicates() {
        let absent = FifoStatus::from_raw(0);
        assert!(!absent.present());
        assert!(absent.is_empty());

        let empty = FifoStatus::from_raw(1 << 31);
        assert!(empty.present());
        assert!(empty.is_empty());
        assert_eq!(empty.word_count(), 0);
        assert_eq!(empty.free_words(), 1023);
        assert!(!empty.is_full());

        let part = FifoStatus::from_raw(1 << 31 | 100);
        assert_eq!(part.word_count(), 100);
        assert_eq!(part.free_words(), 923);
        assert!(!part.is_empty());
        assert!(!part.is_full());

        let full = FifoStatus::from_raw(1 << 31 | 1023);
        assert_eq!(full.free_words(), 0);
        assert!(full.is_full());
    }

    #[test]
    fn hw_status_fields() {
        let sts = HwStatus::from_raw(0x2);
        assert_eq!(sts.state(), Some(HwState::Running));
        assert!(sts.is_running());

        let halted = HwStatus::from_raw(5 << 12 | 0x3A << 4 | 4);
        assert_eq!(halted.state(), Some(HwState::Halted));
        assert_eq!(halted.status_code(), 0x3A);
        assert_eq!(halted.halt_board(), 5);
        assert!(!halted.is_running());

        assert_eq!(HwStatus::from_raw(0xF).state(), None);
    }

    #[test]
    fn anon_bank_reads_not_present() {
        let sts = SysSts::anon();
        assert!(!sts.dac_fifo_status(0).present());
        assert!(!sts.trig_data_fifo_status().present());
        assert_eq!(sts.hw_status().raw(), 0);
    }
}
