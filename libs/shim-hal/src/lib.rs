//! Host-side access to the shim data-acquisition fabric.
//!
//! The fabric hosts eight DAC boards, eight ADC boards, a trigger engine, a
//! system control/status register bank and an SPI clock controller, all
//! reached through a memory-mapped register and FIFO window. This crate owns
//! that window: it maps the physical regions, encodes and decodes the
//! bit-packed command words, gates every FIFO access on the matching status
//! word, and runs the per-board streaming workers that keep waveform
//! playback and sample capture going against files on disk.
//!
//! The interactive console in `services/shim-console` is the only intended
//! caller; everything stringly-typed stays on that side of the fence.

pub mod cmd;
pub mod error;
pub mod fifo;
pub mod mmio;
pub mod program;
pub mod regmap;
pub mod shim;
pub mod spi_clk;
pub mod stream;
pub mod sys_ctrl;
pub mod sys_sts;

pub use error::{ParseKind, Result, ShimError};
pub use program::{AdcProgramCommand, WaveformCommand};
pub use shim::Shim;
pub use stream::StreamEngine;
pub use sys_sts::{FifoStatus, HwState, HwStatus};
