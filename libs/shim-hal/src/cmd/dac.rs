//! DAC command FIFO word encodings.
//!
//! The command space is prefix-coded. A word with bit 31 clear is a *timed*
//! word: trig (bit 30), continue (bit 29), ldac (bit 28) and a 28-bit value.
//! With ldac clear it is a standalone no-op; with ldac set it is the header
//! of a write-update and four channel payload words follow. A word with
//! bit 31 set is a control word selected by bits 30..28: write single
//! channel, or cancel.

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use crate::error::{Result, ShimError};

/// Maximum 28-bit timed value.
pub const VALUE_MAX: u32 = 0x0FFF_FFFF;
/// Channel samples are symmetric 16-bit: -32768 is not representable on the
/// converters.
pub const SAMPLE_MIN: i16 = -32767;
pub const SAMPLE_MAX: i16 = 32767;

const CTRL: u32 = 1 << 31;
const TRIG: u32 = 1 << 30;
const CONT: u32 = 1 << 29;
const LDAC: u32 = 1 << 28;

const SEL_SHIFT: u32 = 28;
const SEL_MASK: u32 = 0x7;
const CH_SHIFT: u32 = 16;
const CH_MASK: u32 = 0x7;

#[derive(FromPrimitive, Debug, Clone, Copy, PartialEq, Eq)]
enum CtrlSel {
    WriteChannel = 0b000,
    Cancel = 0b111,
}

/// A decoded DAC command word, as read back through the debug path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DacCommand {
    Noop { trig: bool, cont: bool, value: u32 },
    /// Write-update header; four channel payload words follow it.
    WriteUpdateHeader { trig: bool, cont: bool, value: u32 },
    WriteChannel { channel: u8, value: i16 },
    Cancel,
}

fn timed(trig: bool, cont: bool, ldac: bool, value: u32) -> Result<u32> {
    if value > VALUE_MAX {
        return Err(ShimError::ValueOutOfRange { field: "DAC value", value, min: 0, max: VALUE_MAX });
    }
    Ok((trig as u32) << 30 | (cont as u32) << 29 | (ldac as u32) << 28 | value)
}

fn check_sample(value: i16) -> Result<u32> {
    if !(SAMPLE_MIN..=SAMPLE_MAX).contains(&value) {
        return Err(ShimError::SampleOutOfRange(value as i32));
    }
    Ok(value as u16 as u32)
}

/// No-op: hold for `value` cycles (delay mode) or until a trigger.
pub fn noop(trig: bool, cont: bool, value: u32) -> Result<u32> { timed(trig, cont, false, value) }

/// Cancel whatever command sequence the board is executing.
pub fn cancel() -> u32 { CTRL | (CtrlSel::Cancel as u32) << SEL_SHIFT }

/// Write-update: a header word plus four payload words carrying all eight
/// channels. Canonical layout: channel 2k sits in the low half of payload
/// word k and channel 2k+1 in its high half, k = 0..4.
///
/// The five words form one logical command; the producer must verify five
/// free FIFO slots before pushing the first.
pub fn write_update(trig: bool, cont: bool, value: u32, samples: &[i16; 8]) -> Result<[u32; 5]> {
    let mut words = [0u32; 5];
    words[0] = timed(trig, cont, true, value)?;
    for k in 0..4 {
        let lo = check_sample(samples[2 * k])?;
        let hi = check_sample(samples[2 * k + 1])?;
        words[k + 1] = hi << 16 | lo;
    }
    Ok(words)
}

/// Stage and latch a single channel.
pub fn write_channel(channel: u8, value: i16) -> Result<u32> {
    if channel > 7 {
        return Err(ShimError::ChannelOutOfRange(channel as u32));
    }
    let value = check_sample(value)?;
    Ok(CTRL | (CtrlSel::WriteChannel as u32) << SEL_SHIFT | (channel as u32) << CH_SHIFT | value)
}

/// Recover the eight channel samples from the four payload words of a
/// write-update, in channel-index order.
pub fn decode_channels(words: &[u32; 4]) -> [i16; 8] {
    let mut samples = [0i16; 8];
    for k in 0..4 {
        samples[2 * k] = words[k] as u16 as i16;
        samples[2 * k + 1] = (words[k] >> 16) as u16 as i16;
    }
    samples
}

pub fn decode(word: u32) -> Option<DacCommand> {
    if word & CTRL == 0 {
        let trig = word & TRIG != 0;
        let cont = word & CONT != 0;
        let value = word & VALUE_MAX;
        if word & LDAC != 0 {
            Some(DacCommand::WriteUpdateHeader { trig, cont, value })
        } else {
            Some(DacCommand::Noop { trig, cont, value })
        }
    } else {
        match CtrlSel::from_u32(word >> SEL_SHIFT & SEL_MASK)? {
            CtrlSel::WriteChannel => Some(DacCommand::WriteChannel {
                channel: (word >> CH_SHIFT & CH_MASK) as u8,
                value: word as u16 as i16,
            }),
            CtrlSel::Cancel => Some(DacCommand::Cancel),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_round_trips() {
        for &(trig, cont, value) in
            &[(false, false, 0), (true, false, 10), (false, true, 0x0FFF_FFFF), (true, true, 12345)]
        {
            let word = noop(trig, cont, value).unwrap();
            assert_eq!(decode(word), Some(DacCommand::Noop { trig, cont, value }));
        }
    }

    #[test]
    fn noop_rejects_wide_value() {
        assert!(noop(false, false, VALUE_MAX + 1).is_err());
    }

    #[test]
    fn write_update_packs_channels_in_index_order() {
        let samples = [1, 2, 3, 4, 5, 6, 7, 8];
        let words = write_update(true, true, 20, &samples).unwrap();
        assert_eq!(
            decode(words[0]),
            Some(DacCommand::WriteUpdateHeader { trig: true, cont: true, value: 20 })
        );
        assert_eq!(words[1], 2 << 16 | 1);
        assert_eq!(words[2], 4 << 16 | 3);
        assert_eq!(words[3], 6 << 16 | 5);
        assert_eq!(words[4], 8 << 16 | 7);
    }

    #[test]
    fn channels_round_trip_across_full_range() {
        let cases: [[i16; 8]; 3] = [
            [-32767, 32767, 0, -1, 1, -16384, 16384, 255],
            [0; 8],
            [32767; 8],
        ];
        for samples in cases {
            let words = write_update(false, false, 0, &samples).unwrap();
            let payload = [words[1], words[2], words[3], words[4]];
            assert_eq!(decode_channels(&payload), samples);
        }
    }

    #[test]
    fn write_update_rejects_negative_full_scale() {
        let mut samples = [0i16; 8];
        samples[3] = -32768;
        assert!(write_update(false, false, 0, &samples).is_err());
    }

    #[test]
    fn write_channel_round_trips() {
        let word = write_channel(1, 12345).unwrap();
        assert_eq!(decode(word), Some(DacCommand::WriteChannel { channel: 1, value: 12345 }));
        let word = write_channel(7, -32767).unwrap();
        assert_eq!(decode(word), Some(DacCommand::WriteChannel { channel: 7, value: -32767 }));
    }

    #[test]
    fn write_channel_rejects_bad_args() {
        assert!(write_channel(8, 0).is_err());
        assert!(write_channel(0, -32768).is_err());
    }

    #[test]
    fn families_occupy_distinct_code_points() {
        // The timed prefix never collides with the control prefix, and the
        // two control selects differ.
        let n = noop(true, true, VALUE_MAX).unwrap();
        assert_eq!(n & CTRL, 0);
        let wu = write_update(true, true, VALUE_MAX, &[0; 8]).unwrap();
        assert_eq!(wu[0] & CTRL, 0);
        assert_ne!(n & LDAC, wu[0] & LDAC);
        let wc = write_channel(7, 32767).unwrap();
        let c = cancel();
        assert_ne!(wc >> SEL_SHIFT, c >> SEL_SHIFT);
        assert_ne!(wc & CTRL, 0);
        assert_ne!(c & CTRL, 0);
    }

    #[test]
    fn cancel_round_trips() {
        assert_eq!(decode(cancel()), Some(DacCommand::Cancel));
    }
}
