//! Physical address map of the shim fabric.
//!
//! Addresses are defined by the hardware design; all sizes are in 32-bit
//! words. Each FIFO is addressed through a single host-visible word: a write
//! pushes, a read pops.

/// Number of DAC/ADC board slots in the fabric.
pub const NUM_BOARDS: usize = 8;

/// System control and configuration register bank.
pub const SYS_CTRL_BASE: u32 = 0x4000_0000;
pub const SYS_CTRL_WORDS: usize = 6;

// Word offsets within the system control bank. Words 2-4 are the
// integrator block (threshold average, window, enable), configured by the
// fabric's boot flow; the host never writes them.
pub const SYSTEM_ENABLE: usize = 0;
pub const BUFFER_RESET: usize = 1;
pub const BOOT_TEST_SKIP: usize = 5;

/// System status register bank: hardware status word, three FIFO status
/// words per board, two trigger FIFO status words.
pub const SYS_STS_BASE: u32 = 0x4010_0000;
pub const SYS_STS_WORDS: usize = 1 + 3 * NUM_BOARDS + 2;

pub const HW_STATUS: usize = 0;

pub const fn dac_cmd_fifo_sts(board: usize) -> usize { 1 + 3 * board }
pub const fn adc_cmd_fifo_sts(board: usize) -> usize { 2 + 3 * board }
pub const fn adc_data_fifo_sts(board: usize) -> usize { 3 + 3 * board }

pub const TRIG_CMD_FIFO_STS: usize = 3 * NUM_BOARDS + 1;
pub const TRIG_DATA_FIFO_STS: usize = 3 * NUM_BOARDS + 2;

/// SPI clock controller interface.
pub const SPI_CLK_BASE: u32 = 0x4020_0000;
pub const SPI_CLK_WORDS: usize = 2048;

// Word offsets within the SPI clock controller.
pub const SPI_CLK_RESET: usize = 0x0;
pub const SPI_CLK_STATUS: usize = 0x4;
pub const SPI_CLK_CFG_0: usize = 0x200;
pub const SPI_CLK_CFG_1: usize = 0x208;
pub const SPI_CLK_PHASE: usize = 0x20C;
pub const SPI_CLK_DUTY: usize = 0x210;
pub const SPI_CLK_DEBUG: usize = 0x214;
pub const SPI_CLK_MOSI_SCK_POL: usize = 0x218;
pub const SPI_CLK_MISO_SCK_POL: usize = 0x21C;
pub const SPI_CLK_ENABLE: usize = 0x25C;

/// FIFO windows. Every FIFO is 1024 words deep and the hardware reserves one
/// slot, so at most 1023 words are ever usable.
pub const FIFO_WORDS: u32 = 1024;

pub const fn dac_fifo_base(board: usize) -> u32 { 0x8000_0000 + (board as u32) * 0x1_0000 }
pub const fn adc_fifo_base(board: usize) -> u32 { 0x8000_1000 + (board as u32) * 0x1_0000 }

pub const TRIG_FIFO_BASE: u32 = 0x8010_0000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_bases_are_per_board() {
        assert_eq!(dac_fifo_base(0), 0x8000_0000);
        assert_eq!(dac_fifo_base(7), 0x8007_0000);
        assert_eq!(adc_fifo_base(0), 0x8000_1000);
        assert_eq!(adc_fifo_base(3), 0x8003_1000);
    }

    #[test]
    fn status_offsets_match_bank_layout() {
        assert_eq!(dac_cmd_fifo_sts(0), 1);
        assert_eq!(adc_cmd_fifo_sts(0), 2);
        assert_eq!(adc_data_fifo_sts(0), 3);
        assert_eq!(dac_cmd_fifo_sts(7), 22);
        assert_eq!(TRIG_CMD_FIFO_STS, 25);
        assert_eq!(TRIG_DATA_FIFO_STS, 26);
        assert_eq!(SYS_STS_WORDS, 27);
    }
}
