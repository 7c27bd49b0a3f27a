//! Bit-exact encoders and decoders for the fabric's command words.
//!
//! Every command is a packed 32-bit word (the DAC write-update is five) whose
//! layout is dictated by the hardware. Encoders validate each field against
//! its declared width and never truncate; decoders are the inverse and back
//! the round-trip tests as well as the console's debug readouts.

pub mod adc;
pub mod dac;
pub mod trigger;
