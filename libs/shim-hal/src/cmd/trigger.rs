//! Trigger engine command words and data assembly.
//!
//! Trigger commands carry a 3-bit opcode in bits 31..29 and a 29-bit payload.
//! Trigger *data* is 64 bits wide, delivered as two consecutive 32-bit pops
//! from the data FIFO, low word first.

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use crate::error::{Result, ShimError};

/// Maximum 29-bit cycle count.
pub const CYCLES_MAX: u32 = 0x1FFF_FFFF;

const OP_SHIFT: u32 = 29;

#[derive(FromPrimitive, Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    SyncCh = 0b000,
    ForceTrig = 0b001,
    SetLockout = 0b010,
    Delay = 0b011,
    ExpectExt = 0b100,
    Cancel = 0b111,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrigCommand {
    SyncCh,
    ForceTrig,
    SetLockout { cycles: u32 },
    Delay { cycles: u32 },
    ExpectExt { count: u32 },
    Cancel,
}

pub fn sync_ch() -> u32 { (Op::SyncCh as u32) << OP_SHIFT }

pub fn force_trig() -> u32 { (Op::ForceTrig as u32) << OP_SHIFT }

pub fn cancel() -> u32 { (Op::Cancel as u32) << OP_SHIFT }

/// Minimum cycle count between accepted triggers; zero lockout is invalid.
pub fn set_lockout(cycles: u32) -> Result<u32> {
    if cycles == 0 || cycles > CYCLES_MAX {
        return Err(ShimError::ValueOutOfRange { field: "lockout cycles", value: cycles, min: 1, max: CYCLES_MAX });
    }
    Ok((Op::SetLockout as u32) << OP_SHIFT | cycles)
}

pub fn delay(cycles: u32) -> Result<u32> {
    if cycles > CYCLES_MAX {
        return Err(ShimError::ValueOutOfRange { field: "delay cycles", value: cycles, min: 0, max: CYCLES_MAX });
    }
    Ok((Op::Delay as u32) << OP_SHIFT | cycles)
}

pub fn expect_ext(count: u32) -> Result<u32> {
    if count > CYCLES_MAX {
        return Err(ShimError::ValueOutOfRange { field: "external trigger count", value: count, min: 0, max: CYCLES_MAX });
    }
    Ok((Op::ExpectExt as u32) << OP_SHIFT | count)
}

pub fn decode(word: u32) -> Option<TrigCommand> {
    let payload = word & CYCLES_MAX;
    match Op::from_u32(word >> OP_SHIFT)? {
        Op::SyncCh => Some(TrigCommand::SyncCh),
        Op::ForceTrig => Some(TrigCommand::ForceTrig),
        Op::SetLockout => Some(TrigCommand::SetLockout { cycles: payload }),
        Op::Delay => Some(TrigCommand::Delay { cycles: payload }),
        Op::ExpectExt => Some(TrigCommand::ExpectExt { count: payload }),
        Op::Cancel => Some(TrigCommand::Cancel),
    }
}

/// Assemble a 64-bit trigger data sample from two pops, first pop low.
pub fn assemble_data(low: u32, high: u32) -> u64 { (high as u64) << 32 | low as u64 }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_round_trip() {
        assert_eq!(decode(sync_ch()), Some(TrigCommand::SyncCh));
        assert_eq!(decode(force_trig()), Some(TrigCommand::ForceTrig));
        assert_eq!(decode(cancel()), Some(TrigCommand::Cancel));
        assert_eq!(decode(set_lockout(1).unwrap()), Some(TrigCommand::SetLockout { cycles: 1 }));
        assert_eq!(decode(delay(0).unwrap()), Some(TrigCommand::Delay { cycles: 0 }));
        assert_eq!(
            decode(expect_ext(CYCLES_MAX).unwrap()),
            Some(TrigCommand::ExpectExt { count: CYCLES_MAX })
        );
    }

    #[test]
    fn opcodes_are_distinct() {
        let words =
            [sync_ch(), force_trig(), set_lockout(1).unwrap(), delay(0).unwrap(), expect_ext(0).unwrap(), cancel()];
        for (i, a) in words.iter().enumerate() {
            for b in &words[i + 1..] {
                assert_ne!(a >> OP_SHIFT, b >> OP_SHIFT);
            }
        }
    }

    #[test]
    fn range_limits_are_enforced() {
        assert!(set_lockout(0).is_err());
        assert!(set_lockout(CYCLES_MAX + 1).is_err());
        assert!(delay(CYCLES_MAX + 1).is_err());
        assert!(expect_ext(CYCLES_MAX + 1).is_err());
    }

    #[test]
    fn data_assembles_high_over_low() {
        assert_eq!(assemble_data(0xdead_beef, 0x0123_4567), 0x0123_4567_dead_beef);
    }
}
