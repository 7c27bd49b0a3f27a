//! The mapped instrument: every register binding and FIFO window, plus the
//! status-checked command and data operations the console invokes.

use crate::cmd::{adc, dac, trigger};
use crate::error::{Result, ShimError};
use crate::fifo::FifoPort;
use crate::mmio::DevMem;
use crate::regmap::{self, NUM_BOARDS};
use crate::spi_clk::SpiClk;
use crate::sys_ctrl::SysCtrl;
use crate::sys_sts::{FifoStatus, SysSts};

pub struct Shim {
    pub sys_ctrl: SysCtrl,
    pub sys_sts: SysSts,
    pub spi_clk: SpiClk,
    dac_fifo: [FifoPort; NUM_BOARDS],
    adc_fifo: [FifoPort; NUM_BOARDS],
    trig_fifo: FifoPort,
}

fn per_board<T>(mut f: impl FnMut(usize) -> Result<T>) -> Result<[T; NUM_BOARDS]> {
    // try_map is not stable; build through a Vec.
    let mut ports = Vec::with_capacity(NUM_BOARDS);
    for board in 0..NUM_BOARDS {
        ports.push(f(board)?);
    }
    Ok(ports.try_into().map_err(|_| ()).expect("exactly NUM_BOARDS entries"))
}

impl Shim {
    /// Map every fabric region through the backing device. Fatal at
    /// initialization if the device cannot be opened or a mapping is
    /// rejected.
    pub fn map() -> Result<Shim> {
        let dev = DevMem::open()?;
        let shim = Shim {
            sys_ctrl: SysCtrl::map(&dev)?,
            sys_sts: SysSts::map(&dev)?,
            spi_clk: SpiClk::map(&dev)?,
            dac_fifo: per_board(|b| FifoPort::map(&dev, regmap::dac_fifo_base(b)))?,
            adc_fifo: per_board(|b| FifoPort::map(&dev, regmap::adc_fifo_base(b)))?,
            trig_fifo: FifoPort::map(&dev, regmap::TRIG_FIFO_BASE)?,
        };
        log::info!("fabric windows mapped");
        Ok(shim)
    }

    /// An instrument backed by anonymous memory instead of the fabric. Every
    /// FIFO reports not-present; used by tests and dry runs.
    pub fn anon() -> Shim {
        Shim {
            sys_ctrl: SysCtrl::anon(),
            sys_sts: SysSts::anon(),
            spi_clk: SpiClk::anon(),
            dac_fifo: per_board(|_| Ok(FifoPort::anon())).unwrap(),
            adc_fifo: per_board(|_| Ok(FifoPort::anon())).unwrap(),
            trig_fifo: FifoPort::anon(),
        }
    }

    /// Turn the system on. Starting the hardware-manager monitor first is
    /// best-effort: a failure warns and the enable still proceeds.
    pub fn turn_on(&self) {
        if let Err(e) = self.sys_sts.start_hw_monitor() {
            log::warn!("failed to start hardware manager monitor: {}", e);
        }
        self.sys_ctrl.turn_on();
    }

    pub fn turn_off(&self) { self.sys_ctrl.turn_off() }

    pub(crate) fn dac_fifo(&self, board: usize) -> &FifoPort { &self.dac_fifo[board] }

    pub(crate) fn adc_fifo(&self, board: usize) -> &FifoPort { &self.adc_fifo[board] }

    fn push_checked(&self, port: &FifoPort, sts: FifoStatus, fifo: &'static str, words: &[u32]) -> Result<()> {
        if !sts.present() {
            return Err(ShimError::FifoNotPresent { fifo });
        }
        if sts.free_words() < words.len() as u32 {
            return Err(ShimError::FifoFull { fifo, words: words.len() as u32 });
        }
        for &w in words {
            port.push(w);
        }
        Ok(())
    }

    fn pop_checked(&self, port: &FifoPort, sts: FifoStatus, fifo: &'static str) -> Result<u32> {
        if !sts.present() {
            return Err(ShimError::FifoNotPresent { fifo });
        }
        if sts.is_empty() {
            return Err(ShimError::FifoEmpty { fifo });
        }
        Ok(port.pop())
    }

    // ---------- DAC ----------

    pub fn dac_noop(&self, board: usize, trig: bool, cont: bool, value: u32) -> Result<()> {
        let word = dac::noop(trig, cont, value)?;
        self.push_checked(&self.dac_fifo[board], self.sys_sts.dac_fifo_status(board), "DAC command", &[word])
    }

    pub fn dac_cancel(&self, board: usize) -> Result<()> {
        self.push_checked(&self.dac_fifo[board], self.sys_sts.dac_fifo_status(board), "DAC command", &[dac::cancel()])
    }

    /// Push the full five-word write-update as one logical command; the free
    /// space check covers all five words before the first is pushed.
    pub fn dac_write_update(
        &self,
        board: usize,
        trig: bool,
        cont: bool,
        value: u32,
        samples: &[i16; 8],
    ) -> Result<()> {
        let words = dac::write_update(trig, cont, value, samples)?;
        self.push_checked(&self.dac_fifo[board], self.sys_sts.dac_fifo_status(board), "DAC command", &words)
    }

    pub fn dac_write_channel(&self, board: usize, channel: u8, value: i16) -> Result<()> {
        let word = dac::write_channel(channel, value)?;
        self.push_checked(&self.dac_fifo[board], self.sys_sts.dac_fifo_status(board), "DAC command", &[word])
    }

    /// Pop one word from the DAC window's read-back side.
    pub fn dac_data_pop(&self, board: usize) -> Result<u32> {
        self.pop_checked(&self.dac_fifo[board], self.sys_sts.dac_fifo_status(board), "DAC data")
    }

    // ---------- ADC ----------

    pub fn adc_noop(&self, board: usize, trig: bool, cont: bool, value: u32) -> Result<()> {
        let word = adc::noop(trig, cont, value)?;
        self.push_checked(&self.adc_fifo[board], self.sys_sts.adc_cmd_fifo_status(board), "ADC command", &[word])
    }

    pub fn adc_read(&self, board: usize, trig: bool, cont: bool, delay: u32) -> Result<()> {
        let word = adc::read(trig, cont, delay)?;
        self.push_checked(&self.adc_fifo[board], self.sys_sts.adc_cmd_fifo_status(board), "ADC command", &[word])
    }

    pub fn adc_read_channel(&self, board: usize, channel: u8) -> Result<()> {
        let word = adc::read_channel(channel)?;
        self.push_checked(&self.adc_fifo[board], self.sys_sts.adc_cmd_fifo_status(board), "ADC command", &[word])
    }

    pub fn adc_loop_next(&self, board: usize, count: u32) -> Result<()> {
        let word = adc::loop_next(count)?;
        self.push_checked(&self.adc_fifo[board], self.sys_sts.adc_cmd_fifo_status(board), "ADC command", &[word])
    }

    pub fn adc_set_order(&self, board: usize, order: &[u8; 8]) -> Result<()> {
        let word = adc::set_order(order)?;
        self.push_checked(&self.adc_fifo[board], self.sys_sts.adc_cmd_fifo_status(board), "ADC command", &[word])
    }

    pub fn adc_cancel(&self, board: usize) -> Result<()> {
        self.push_checked(&self.adc_fifo[board], self.sys_sts.adc_cmd_fifo_status(board), "ADC command", &[adc::cancel()])
    }

    pub fn adc_data_pop(&self, board: usize) -> Result<u32> {
        self.pop_checked(&self.adc_fifo[board], self.sys_sts.adc_data_fifo_status(board), "ADC data")
    }

    /// Pop one word produced by a single-channel read and return its sample.
    pub fn adc_pop_channel_sample(&self, board: usize) -> Result<i16> {
        let word = self.adc_data_pop(board)?;
        Ok(adc::offset_to_signed(word as u16))
    }

    // ---------- Trigger ----------

    fn trig_push(&self, word: u32) -> Result<()> {
        self.push_checked(&self.trig_fifo, self.sys_sts.trig_cmd_fifo_status(), "trigger command", &[word])
    }

    pub fn trig_sync_ch(&self) -> Result<()> { self.trig_push(trigger::sync_ch()) }

    pub fn trig_force(&self) -> Result<()> { self.trig_push(trigger::force_trig()) }

    pub fn trig_cancel(&self) -> Result<()> { self.trig_push(trigger::cancel()) }

    pub fn trig_set_lockout(&self, cycles: u32) -> Result<()> { self.trig_push(trigger::set_lockout(cycles)?) }

    pub fn trig_delay(&self, cycles: u32) -> Result<()> { self.trig_push(trigger::delay(cycles)?) }

    pub fn trig_expect_ext(&self, count: u32) -> Result<()> { self.trig_push(trigger::expect_ext(count)?) }

    /// Read one 64-bit trigger data sample as two pops, low word first.
    /// Permitted only when the FIFO holds at least two words.
    pub fn trig_data_read(&self) -> Result<u64> {
        let sts = self.sys_sts.trig_data_fifo_status();
        if !sts.present() {
            return Err(ShimError::FifoNotPresent { fifo: "trigger data" });
        }
        if sts.word_count() < 2 {
            return Err(ShimError::FifoEmpty { fifo: "trigger data" });
        }
        let low = self.trig_fifo.pop();
        let high = self.trig_fifo.pop();
        Ok(trigger::assemble_data(low, high))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Without the fabric every status word reads zero, so each checked
    // operation must refuse before touching the window.
    #[test]
    fn checked_ops_refuse_absent_fifos() {
        let shim = Shim::anon();
        assert!(matches!(shim.dac_noop(0, false, false, 1), Err(ShimError::FifoNotPresent { .. })));
        assert!(matches!(shim.dac_data_pop(3), Err(ShimError::FifoNotPresent { .. })));
        assert!(matches!(shim.adc_cancel(7), Err(ShimError::FifoNotPresent { .. })));
        assert!(matches!(shim.trig_sync_ch(), Err(ShimError::FifoNotPresent { .. })));
        assert!(matches!(shim.trig_data_read(), Err(ShimError::FifoNotPresent { .. })));
    }

    #[test]
    fn encode_errors_surface_before_status_checks() {
        let shim = Shim::anon();
        assert!(matches!(
            shim.trig_set_lockout(0),
            Err(ShimError::ValueOutOfRange { .. })
        ));
        assert!(matches!(shim.dac_write_channel(0, 8, 0), Err(ShimError::ChannelOutOfRange(8))));
    }
}
