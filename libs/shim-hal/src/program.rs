//! Waveform and ADC program file parsers.
//!
//! Both formats are line-oriented text: blank lines and `#` comments are
//! ignored, every other line is one command. Parsers validate every field
//! against the hardware ranges and report failures with the 1-based line
//! number. The continue bit is not a file concern; the playback worker
//! assigns it (last command of the last loop ends the sequence).
//!
//! The emitters write the canonical text form back out; `parse(emit(x)) == x`
//! for any command list.

use std::path::Path;

use crate::error::{ParseKind, Result, ShimError};

/// Waveform values are 25-bit in the file format.
pub const WAVEFORM_VALUE_MAX: u32 = 0x01FF_FFFF;
/// Loop counts are 25-bit and at least one.
pub const PROGRAM_LOOP_MAX: u32 = 0x01FF_FFFF;

pub const CHANNEL_MIN: i32 = -32767;
pub const CHANNEL_MAX: i32 = 32767;

/// One line of a waveform file: a timed no-op, or a full write-update when
/// channel samples are present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaveformCommand {
    /// Trigger mode (`T`) vs delay mode (`D`).
    pub trig: bool,
    pub value: u32,
    pub samples: Option<[i16; 8]>,
}

impl WaveformCommand {
    /// FIFO slots one push of this command occupies.
    pub fn words_needed(&self) -> u32 {
        if self.samples.is_some() { 5 } else { 1 }
    }
}

/// One line of an ADC program file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdcProgramCommand {
    /// `L n`: prime the next command to repeat n times.
    Loop(u32),
    /// `T v` / `D v`: no-op in trigger or delay mode.
    Noop { trig: bool, value: u32 },
    /// `O s0..s7`: set the channel sampling order.
    SetOrder([u8; 8]),
}

fn err(line: usize, kind: ParseKind) -> ShimError { ShimError::Parse { line, kind } }

fn parse_u32(line: usize, token: &str) -> Result<u32> {
    token.parse::<u32>().map_err(|_| err(line, ParseKind::InvalidNumber(token.into())))
}

fn parse_ranged(line: usize, token: &str, min: u32, max: u32) -> Result<u32> {
    let value = parse_u32(line, token)?;
    if value < min || value > max {
        return Err(err(
            line,
            ParseKind::ValueOutOfRange { value: value as i64, min: min as i64, max: max as i64 },
        ));
    }
    Ok(value)
}

fn parse_channel(line: usize, token: &str) -> Result<i16> {
    let value =
        token.parse::<i32>().map_err(|_| err(line, ParseKind::InvalidNumber(token.into())))?;
    if !(CHANNEL_MIN..=CHANNEL_MAX).contains(&value) {
        return Err(err(
            line,
            ParseKind::ValueOutOfRange { value: value as i64, min: CHANNEL_MIN as i64, max: CHANNEL_MAX as i64 },
        ));
    }
    Ok(value as i16)
}

/// Lines that carry a command, with their 1-based numbers.
fn significant_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines().enumerate().filter_map(|(idx, raw)| {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') { None } else { Some((idx + 1, line)) }
    })
}

pub fn parse_waveform(text: &str) -> Result<Vec<WaveformCommand>> {
    let mut commands = Vec::new();
    for (line, content) in significant_lines(text) {
        let fields: Vec<&str> = content.split_whitespace().collect();
        let trig = match fields[0] {
            "D" => false,
            "T" => true,
            other => {
                return Err(err(line, ParseKind::UnknownOpcodeChar(other.chars().next().unwrap_or(' '))));
            }
        };
        match fields.len() {
            2 | 10 => {}
            found => {
                return Err(err(line, ParseKind::WrongFieldCount { expected: "2 or 10", found }));
            }
        }
        let value = parse_ranged(line, fields[1], 0, WAVEFORM_VALUE_MAX)?;
        let samples = if fields.len() == 10 {
            let mut ch = [0i16; 8];
            for (i, token) in fields[2..].iter().enumerate() {
                ch[i] = parse_channel(line, token)?;
            }
            Some(ch)
        } else {
            None
        };
        commands.push(WaveformCommand { trig, value, samples });
    }
    if commands.is_empty() {
        return Err(ShimError::EmptyProgram);
    }
    Ok(commands)
}

pub fn parse_waveform_file(path: &Path) -> Result<Vec<WaveformCommand>> {
    parse_waveform(&std::fs::read_to_string(path)?)
}

pub fn parse_adc_program(text: &str) -> Result<Vec<AdcProgramCommand>> {
    let mut commands = Vec::new();
    for (line, content) in significant_lines(text) {
        let fields: Vec<&str> = content.split_whitespace().collect();
        let command = match fields[0] {
            "L" | "T" | "D" => {
                if fields.len() != 2 {
                    return Err(err(line, ParseKind::WrongFieldCount { expected: "2", found: fields.len() }));
                }
                if fields[0] == "L" {
                    AdcProgramCommand::Loop(parse_ranged(line, fields[1], 1, PROGRAM_LOOP_MAX)?)
                } else {
                    AdcProgramCommand::Noop {
                        trig: fields[0] == "T",
                        value: parse_ranged(line, fields[1], 0, WAVEFORM_VALUE_MAX)?,
                    }
                }
            }
            "O" => {
                if fields.len() != 9 {
                    return Err(err(line, ParseKind::WrongFieldCount { expected: "9", found: fields.len() }));
                }
                let mut order = [0u8; 8];
                for (i, token) in fields[1..].iter().enumerate() {
                    let value = token
                        .parse::<i64>()
                        .map_err(|_| err(line, ParseKind::InvalidNumber((*token).into())))?;
                    if !(0..=7).contains(&value) {
                        return Err(err(line, ParseKind::OrderValueOutOfRange(value)));
                    }
                    order[i] = value as u8;
                }
                AdcProgramCommand::SetOrder(order)
            }
            other => {
                return Err(err(line, ParseKind::UnknownOpcodeChar(other.chars().next().unwrap_or(' '))));
            }
        };
        commands.push(command);
    }
    if commands.is_empty() {
        return Err(ShimError::EmptyProgram);
    }
    Ok(commands)
}

pub fn parse_adc_program_file(path: &Path) -> Result<Vec<AdcProgramCommand>> {
    parse_adc_program(&std::fs::read_to_string(path)?)
}

/// Canonical text form of a waveform command list.
pub fn emit_waveform(commands: &[WaveformCommand]) -> String {
    use std::fmt::Write;
    let mut out = String::new();
    for cmd in commands {
        let mode = if cmd.trig { 'T' } else { 'D' };
        match &cmd.samples {
            None => writeln!(out, "{} {}", mode, cmd.value).unwrap(),
            Some(ch) => {
                write!(out, "{} {}", mode, cmd.value).unwrap();
                for value in ch {
                    write!(out, " {}", value).unwrap();
                }
                out.push('\n');
            }
        }
    }
    out
}

/// Canonical text form of an ADC program.
pub fn emit_adc_program(commands: &[AdcProgramCommand]) -> String {
    use std::fmt::Write;
    let mut out = String::new();
    for cmd in commands {
        match cmd {
            AdcProgramCommand::Loop(count) => writeln!(out, "L {}", count).unwrap(),
            AdcProgramCommand::Noop { trig, value } => {
                writeln!(out, "{} {}", if *trig { 'T' } else { 'D' }, value).unwrap()
            }
            AdcProgramCommand::SetOrder(order) => {
                out.push('O');
                for value in order {
                    write!(out, " {}", value).unwrap();
                }
                out.push('\n');
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_line_of(result: Result<Vec<WaveformCommand>>) -> usize {
        match result {
            Err(ShimError::Parse { line, .. }) => line,
            other => panic!("expected parse error, got {:?}", other.map(|v| v.len())),
        }
    }

    #[test]
    fn waveform_accepts_both_line_forms() {
        let text = "# header comment\n\nD 10\nT 20 1 2 3 4 5 6 7 8\n";
        let cmds = parse_waveform(text).unwrap();
        assert_eq!(
            cmds,
            vec![
                WaveformCommand { trig: false, value: 10, samples: None },
                WaveformCommand { trig: true, value: 20, samples: Some([1, 2, 3, 4, 5, 6, 7, 8]) },
            ]
        );
        assert_eq!(cmds[0].words_needed(), 1);
        assert_eq!(cmds[1].words_needed(), 5);
    }

    #[test]
    fn waveform_errors_carry_line_numbers() {
        // Comments and blanks still count toward the line number.
        let text = "# comment\nD 10\nX 5\n";
        assert_eq!(parse_line_of(parse_waveform(text)), 3);

        let text = "D 10\nT 1 2 3\n";
        assert_eq!(parse_line_of(parse_waveform(text)), 2);

        let text = "D 33554432\n";
        assert_eq!(parse_line_of(parse_waveform(text)), 1);

        let text = "T 1 1 2 3 4 5 6 7 40000\n";
        assert_eq!(parse_line_of(parse_waveform(text)), 1);

        let text = "D ten\n";
        assert_eq!(parse_line_of(parse_waveform(text)), 1);
    }

    #[test]
    fn waveform_rejects_empty_programs() {
        assert!(matches!(parse_waveform("# nothing\n\n"), Err(ShimError::EmptyProgram)));
        assert!(matches!(parse_waveform(""), Err(ShimError::EmptyProgram)));
    }

    #[test]
    fn waveform_round_trips_through_emitter() {
        let cmds = vec![
            WaveformCommand { trig: false, value: 0, samples: None },
            WaveformCommand { trig: true, value: WAVEFORM_VALUE_MAX, samples: Some([-32767, 32767, 0, 1, -1, 100, -100, 7]) },
            WaveformCommand { trig: false, value: 12345, samples: Some([0; 8]) },
        ];
        assert_eq!(parse_waveform(&emit_waveform(&cmds)).unwrap(), cmds);
    }

    #[test]
    fn adc_program_parses_all_forms() {
        let text = "L 3\nD 50\nT 100000\nO 7 6 5 4 3 2 1 0\n";
        let cmds = parse_adc_program(text).unwrap();
        assert_eq!(
            cmds,
            vec![
                AdcProgramCommand::Loop(3),
                AdcProgramCommand::Noop { trig: false, value: 50 },
                AdcProgramCommand::Noop { trig: true, value: 100_000 },
                AdcProgramCommand::SetOrder([7, 6, 5, 4, 3, 2, 1, 0]),
            ]
        );
    }

    #[test]
    fn adc_program_validates_fields() {
        assert!(matches!(
            parse_adc_program("L 0\n"),
            Err(ShimError::Parse { line: 1, kind: ParseKind::ValueOutOfRange { .. } })
        ));
        assert!(matches!(
            parse_adc_program("D 1\nO 0 1 2 3 4 5 6 8\n"),
            Err(ShimError::Parse { line: 2, kind: ParseKind::OrderValueOutOfRange(8) })
        ));
        assert!(matches!(
            parse_adc_program("O 0 1 2 3\n"),
            Err(ShimError::Parse { line: 1, kind: ParseKind::WrongFieldCount { .. } })
        ));
        assert!(matches!(
            parse_adc_program("Q 5\n"),
            Err(ShimError::Parse { line: 1, kind: ParseKind::UnknownOpcodeChar('Q') })
        ));
        assert!(matches!(parse_adc_program("# only comments\n"), Err(ShimError::EmptyProgram)));
    }

    #[test]
    fn adc_program_round_trips_through_emitter() {
        let cmds = vec![
            AdcProgramCommand::Loop(PROGRAM_LOOP_MAX),
            AdcProgramCommand::SetOrder([0, 1, 2, 3, 4, 5, 6, 7]),
            AdcProgramCommand::Noop { trig: true, value: 0 },
            AdcProgramCommand::Noop { trig: false, value: WAVEFORM_VALUE_MAX },
        ];
        assert_eq!(parse_adc_program(&emit_adc_program(&cmds)).unwrap(), cmds);
    }
}
