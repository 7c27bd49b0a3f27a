//! Argument parsing helpers shared by every command.

use bitflags::bitflags;
use shim_hal::ShimError;

bitflags! {
    /// Optional `--` switches a command line may carry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CmdFlags: u8 {
        const ALL = 1 << 0;
        const CONTINUE = 1 << 1;
        const SIMPLE = 1 << 2;
    }
}

fn config(msg: String) -> ShimError { ShimError::Config(msg) }

/// Split a line into its verb, positional arguments and flags.
pub fn tokenize(line: &str) -> Result<(String, Vec<String>, CmdFlags), ShimError> {
    let mut args = Vec::new();
    let mut flags = CmdFlags::empty();
    for token in line.split_whitespace() {
        match token {
            "--all" => flags |= CmdFlags::ALL,
            "--continue" => flags |= CmdFlags::CONTINUE,
            "--simple" => flags |= CmdFlags::SIMPLE,
            other if other.starts_with("--") => {
                return Err(config(format!("unknown flag '{}'", other)));
            }
            other => args.push(other.to_string()),
        }
    }
    if args.is_empty() {
        return Err(config("empty command".into()));
    }
    let verb = args.remove(0);
    Ok((verb, args, flags))
}

pub fn ensure_flags(verb: &str, flags: CmdFlags, allowed: CmdFlags) -> Result<(), ShimError> {
    if flags.difference(allowed).is_empty() {
        Ok(())
    } else {
        Err(config(format!("invalid flag for command '{}'", verb)))
    }
}

pub fn ensure_args(verb: &str, args: &[String], min: usize, max: usize) -> Result<(), ShimError> {
    if args.len() < min || args.len() > max {
        Err(config(format!(
            "command '{}' expects {}-{} arguments, but {} were provided",
            verb,
            min,
            max,
            args.len()
        )))
    } else {
        Ok(())
    }
}

/// Parse an unsigned value: `0b` binary, `0x` hex, leading `0` octal,
/// decimal otherwise.
pub fn parse_value(token: &str) -> Result<u32, ShimError> {
    let t = token.trim();
    let parsed = if let Some(rest) = t.strip_prefix("0b").or_else(|| t.strip_prefix("0B")) {
        u32::from_str_radix(rest, 2)
    } else if let Some(rest) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        u32::from_str_radix(rest, 16)
    } else if t.len() > 1 && t.starts_with('0') {
        u32::from_str_radix(&t[1..], 8)
    } else {
        t.parse::<u32>()
    };
    parsed.map_err(|_| config(format!("invalid value '{}'", token)))
}

pub fn parse_ranged(token: &str, what: &str, min: u32, max: u32) -> Result<u32, ShimError> {
    let value = parse_value(token)?;
    if value < min || value > max {
        return Err(config(format!("{} out of range: {} (valid range {} - {})", what, value, min, max)));
    }
    Ok(value)
}

/// Parse a signed value, radix prefixes allowed after the sign.
pub fn parse_signed(token: &str) -> Result<i32, ShimError> {
    let t = token.trim();
    if let Some(rest) = t.strip_prefix('-') {
        let magnitude = parse_value(rest)?;
        if magnitude > 1 << 31 {
            return Err(config(format!("invalid value '{}'", token)));
        }
        Ok((magnitude as i64).wrapping_neg() as i32)
    } else {
        let magnitude = parse_value(t)?;
        if magnitude > i32::MAX as u32 {
            return Err(config(format!("invalid value '{}'", token)));
        }
        Ok(magnitude as i32)
    }
}

/// Parse a 16-bit channel sample, symmetric range.
pub fn parse_sample(token: &str) -> Result<i16, ShimError> {
    let value = parse_signed(token)?;
    if !(-32767..=32767).contains(&value) {
        return Err(config(format!("channel value out of range: {} (valid range -32767 - 32767)", value)));
    }
    Ok(value as i16)
}

/// Board numbers are 0-7.
pub fn parse_board(token: &str) -> Result<usize, ShimError> {
    match token.parse::<i64>() {
        Ok(board) if (0..8).contains(&board) => Ok(board as usize),
        _ => Err(config(format!("invalid board number '{}': must be 0-7", token))),
    }
}

/// Global channel numbers are 0-63; board = channel / 8, local = channel % 8.
pub fn parse_global_channel(token: &str) -> Result<(usize, u8), ShimError> {
    match token.parse::<i64>() {
        Ok(ch) if (0..64).contains(&ch) => Ok(((ch / 8) as usize, (ch % 8) as u8)),
        _ => Err(config(format!("invalid channel number '{}': must be 0-63", token))),
    }
}

/// `trig` or `delay`.
pub fn parse_trig_mode(token: &str) -> Result<bool, ShimError> {
    match token {
        "trig" => Ok(true),
        "delay" => Ok(false),
        other => Err(config(format!("invalid trigger mode '{}': must be 'trig' or 'delay'", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_radix_prefixes() {
        assert_eq!(parse_value("255").unwrap(), 255);
        assert_eq!(parse_value("0xFF").unwrap(), 255);
        assert_eq!(parse_value("0b1111").unwrap(), 15);
        assert_eq!(parse_value("017").unwrap(), 15);
        assert_eq!(parse_value("0").unwrap(), 0);
        assert!(parse_value("0xZZ").is_err());
        assert!(parse_value("ten").is_err());
    }

    #[test]
    fn signed_values() {
        assert_eq!(parse_signed("-32767").unwrap(), -32767);
        assert_eq!(parse_signed("-0x10").unwrap(), -16);
        assert_eq!(parse_signed("100").unwrap(), 100);
        assert!(parse_sample("-32768").is_err());
        assert_eq!(parse_sample("32767").unwrap(), 32767);
    }

    #[test]
    fn board_and_channel_ranges() {
        assert_eq!(parse_board("7").unwrap(), 7);
        assert!(parse_board("8").is_err());
        assert!(parse_board("-1").is_err());
        assert_eq!(parse_global_channel("9").unwrap(), (1, 1));
        assert_eq!(parse_global_channel("63").unwrap(), (7, 7));
        assert!(parse_global_channel("64").is_err());
    }

    #[test]
    fn tokenize_extracts_flags_anywhere() {
        let (verb, args, flags) = tokenize("read_adc_data 3 --all").unwrap();
        assert_eq!(verb, "read_adc_data");
        assert_eq!(args, vec!["3"]);
        assert_eq!(flags, CmdFlags::ALL);

        let (verb, args, flags) = tokenize("dac_noop 0 --continue trig 10").unwrap();
        assert_eq!(verb, "dac_noop");
        assert_eq!(args, vec!["0", "trig", "10"]);
        assert_eq!(flags, CmdFlags::CONTINUE);

        assert!(tokenize("cmd --bogus").is_err());
        assert!(tokenize("   ").is_err());
    }
}
