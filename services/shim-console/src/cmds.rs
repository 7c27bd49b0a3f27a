//! Command parsing and dispatch.
//!
//! A line is tokenized into a verb, arguments and flags, then parsed into a
//! typed [`Request`]; only this module handles raw strings, the hardware
//! library below never sees them. Dispatch hands each request to its
//! functional area.

use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

use shim_hal::{Shim, ShimError, StreamEngine};

mod args;
mod paths;

mod adc;
mod dac;
mod diag;
mod fifo;
mod stream;
mod sys;
mod trig;

pub use args::CmdFlags;
use args::*;

/// State shared by every command.
pub struct CommonEnv {
    pub shim: Arc<Shim>,
    pub engine: Arc<StreamEngine>,
    /// Mirrors the runtime log gate; the `verbose` command toggles both.
    pub verbose: bool,
    /// Active command log, if any.
    pub log_file: Option<File>,
    /// Script lines queued by `load_commands`, picked up by the REPL.
    pub script: Option<Vec<(usize, String)>>,
    pub should_exit: bool,
}

impl CommonEnv {
    pub fn new(shim: Arc<Shim>, engine: Arc<StreamEngine>) -> CommonEnv {
        CommonEnv { shim, engine, verbose: false, log_file: None, script: None, should_exit: false }
    }
}

/// A fully validated operator request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Help,
    Verbose,
    On,
    Off,
    Sts,
    Dbg,
    HardReset,
    Exit,
    SetBootTestSkip(u16),
    SetDebug(u16),
    SetCmdBufReset(u32),
    SetDataBufReset(u32),
    InvertMosiClk,
    InvertMisoClk,
    DacCmdFifoSts(usize),
    DacDataFifoSts(usize),
    AdcCmdFifoSts(usize),
    AdcDataFifoSts(usize),
    TrigCmdFifoSts,
    TrigDataFifoSts,
    ReadDacData { board: usize, all: bool },
    ReadAdcData { board: usize, all: bool },
    ReadTrigData { all: bool },
    ReadDacDbg { board: usize, all: bool },
    ReadAdcDbg { board: usize, all: bool },
    TrigSyncCh,
    TrigForce,
    TrigCancel,
    TrigSetLockout(u32),
    TrigDelay(u32),
    TrigExpectExt(u32),
    DacNoop { board: usize, trig: bool, value: u32, cont: bool },
    AdcNoop { board: usize, trig: bool, value: u32, cont: bool },
    DacCancel(usize),
    AdcCancel(usize),
    WriteDacUpdate { board: usize, samples: [i16; 8], trig: bool, value: u32, cont: bool },
    AdcSetOrd { board: usize, order: [u8; 8] },
    AdcSimpleRead { board: usize, loop_count: u32, delay: u32 },
    AdcRead { board: usize, loop_count: u32, delay: u32 },
    ReadAdcToFile { board: usize, path: PathBuf, all: bool },
    StreamAdcToFile { board: usize, path: PathBuf },
    StreamDacFromFile { board: usize, path: PathBuf, loop_count: u32 },
    StreamAdcFromFile { board: usize, path: PathBuf, loop_count: u32, simple: bool },
    StopDacStream(usize),
    StopAdcStream(usize),
    LogCommands(PathBuf),
    StopLog,
    LoadCommands(PathBuf),
    DoDacWrCh { board: usize, channel: u8, value: i16 },
    DoAdcRdCh { board: usize, channel: u8 },
    ReadAdcSingle { board: usize, channel: u8, all: bool },
    SetAndCheck { board: usize, channel: u8, value: i16 },
    ChannelTest { board: usize, channel: u8, value: i16 },
    WaveformTest,
}

/// Execute one command line: log it, parse it, dispatch it.
pub fn execute_line(line: &str, env: &mut CommonEnv) -> Result<Option<String>, ShimError> {
    let (verb, args, flags) = tokenize(line)?;
    if let Some(log) = env.log_file.as_mut() {
        // The logging controls themselves stay out of the log so a replay
        // cannot clobber it.
        if !matches!(verb.as_str(), "log_commands" | "stop_log" | "load_commands") {
            use std::io::Write;
            writeln!(log, "{}", line)?;
            log.flush()?;
        }
    }
    let request = parse_request(&verb, &args, flags)?;
    dispatch(request, env)
}

fn parse_request(verb: &str, args: &[String], flags: CmdFlags) -> Result<Request, ShimError> {
    use Request::*;

    let no_flags = CmdFlags::empty();
    let plain = |req: Request| -> Result<Request, ShimError> {
        ensure_args(verb, args, 0, 0)?;
        ensure_flags(verb, flags, no_flags)?;
        Ok(req)
    };
    let value16 = || -> Result<u16, ShimError> {
        ensure_args(verb, args, 1, 1)?;
        ensure_flags(verb, flags, no_flags)?;
        Ok(parse_ranged(&args[0], "value", 0, u16::MAX as u32)? as u16)
    };
    let board_only = || -> Result<usize, ShimError> {
        ensure_args(verb, args, 1, 1)?;
        ensure_flags(verb, flags, no_flags)?;
        parse_board(&args[0])
    };
    let board_all = || -> Result<(usize, bool), ShimError> {
        ensure_args(verb, args, 1, 1)?;
        ensure_flags(verb, flags, CmdFlags::ALL)?;
        Ok((parse_board(&args[0])?, flags.contains(CmdFlags::ALL)))
    };

    match verb {
        "help" => plain(Help),
        "verbose" => plain(Verbose),
        "on" => plain(On),
        "off" => plain(Off),
        "sts" => plain(Sts),
        "dbg" => plain(Dbg),
        "hard_reset" => plain(HardReset),
        "exit" => plain(Exit),

        "set_boot_test_skip" => Ok(SetBootTestSkip(value16()?)),
        "set_debug" => Ok(SetDebug(value16()?)),
        "set_cmd_buf_reset" | "set_data_buf_reset" => {
            ensure_args(verb, args, 1, 1)?;
            ensure_flags(verb, flags, no_flags)?;
            let mask = parse_ranged(&args[0], "mask", 0, 0x1_FFFF)?;
            Ok(if verb == "set_cmd_buf_reset" { SetCmdBufReset(mask) } else { SetDataBufReset(mask) })
        }
        "invert_mosi_clk" => plain(InvertMosiClk),
        "invert_miso_clk" => plain(InvertMisoClk),

        "dac_cmd_fifo_sts" => Ok(DacCmdFifoSts(board_only()?)),
        "dac_data_fifo_sts" => Ok(DacDataFifoSts(board_only()?)),
        "adc_cmd_fifo_sts" => Ok(AdcCmdFifoSts(board_only()?)),
        "adc_data_fifo_sts" => Ok(AdcDataFifoSts(board_only()?)),
        "trig_cmd_fifo_sts" => plain(TrigCmdFifoSts),
        "trig_data_fifo_sts" => plain(TrigDataFifoSts),

        "read_dac_data" => board_all().map(|(board, all)| ReadDacData { board, all }),
        "read_adc_data" => board_all().map(|(board, all)| ReadAdcData { board, all }),
        "read_trig_data" => {
            ensure_args(verb, args, 0, 0)?;
            ensure_flags(verb, flags, CmdFlags::ALL)?;
            Ok(ReadTrigData { all: flags.contains(CmdFlags::ALL) })
        }
        "read_dac_dbg" => board_all().map(|(board, all)| ReadDacDbg { board, all }),
        "read_adc_dbg" => board_all().map(|(board, all)| ReadAdcDbg { board, all }),

        "sync_ch" => plain(TrigSyncCh),
        "force_trig" => plain(TrigForce),
        "trig_cancel" => plain(TrigCancel),
        "trig_set_lockout" => {
            ensure_args(verb, args, 1, 1)?;
            ensure_flags(verb, flags, no_flags)?;
            Ok(TrigSetLockout(parse_ranged(&args[0], "lockout cycles", 1, 0x1FFF_FFFF)?))
        }
        "trig_delay" => {
            ensure_args(verb, args, 1, 1)?;
            ensure_flags(verb, flags, no_flags)?;
            Ok(TrigDelay(parse_ranged(&args[0], "delay cycles", 0, 0x1FFF_FFFF)?))
        }
        "trig_expect_ext" => {
            ensure_args(verb, args, 1, 1)?;
            ensure_flags(verb, flags, no_flags)?;
            Ok(TrigExpectExt(parse_ranged(&args[0], "external trigger count", 0, 0x1FFF_FFFF)?))
        }

        "dac_noop" | "adc_noop" => {
            ensure_args(verb, args, 3, 3)?;
            ensure_flags(verb, flags, CmdFlags::CONTINUE)?;
            let board = parse_board(&args[0])?;
            let trig = parse_trig_mode(&args[1])?;
            let value = parse_ranged(&args[2], "value", 0, 0x0FFF_FFFF)?;
            let cont = flags.contains(CmdFlags::CONTINUE);
            Ok(if verb == "dac_noop" {
                DacNoop { board, trig, value, cont }
            } else {
                AdcNoop { board, trig, value, cont }
            })
        }
        "dac_cancel" => Ok(DacCancel(board_only()?)),
        "adc_cancel" => Ok(AdcCancel(board_only()?)),

        "write_dac_update" => {
            ensure_args(verb, args, 11, 11)?;
            ensure_flags(verb, flags, CmdFlags::CONTINUE)?;
            let board = parse_board(&args[0])?;
            let mut samples = [0i16; 8];
            for (i, token) in args[1..9].iter().enumerate() {
                samples[i] = parse_sample(token)?;
            }
            let trig = parse_trig_mode(&args[9])?;
            let value = parse_ranged(&args[10], "value", 0, 0x0FFF_FFFF)?;
            Ok(WriteDacUpdate { board, samples, trig, value, cont: flags.contains(CmdFlags::CONTINUE) })
        }
        "adc_set_ord" => {
            ensure_args(verb, args, 9, 9)?;
            ensure_flags(verb, flags, no_flags)?;
            let board = parse_board(&args[0])?;
            let mut order = [0u8; 8];
            for (i, token) in args[1..].iter().enumerate() {
                order[i] = parse_ranged(token, "order value", 0, 7)? as u8;
            }
            Ok(AdcSetOrd { board, order })
        }
        "adc_simple_read" | "adc_read" => {
            ensure_args(verb, args, 3, 3)?;
            ensure_flags(verb, flags, no_flags)?;
            let board = parse_board(&args[0])?;
            let max_loops = if verb == "adc_read" { 0x01FF_FFFF } else { u32::MAX };
            let loop_count = parse_ranged(&args[1], "loop count", 1, max_loops)?;
            let delay = parse_ranged(&args[2], "delay cycles", 0, 0x1FFF_FFFF)?;
            Ok(if verb == "adc_read" {
                AdcRead { board, loop_count, delay }
            } else {
                AdcSimpleRead { board, loop_count, delay }
            })
        }

        "read_adc_to_file" => {
            ensure_args(verb, args, 2, 2)?;
            ensure_flags(verb, flags, CmdFlags::ALL)?;
            Ok(ReadAdcToFile {
                board: parse_board(&args[0])?,
                path: paths::clean_and_expand(&args[1]),
                all: flags.contains(CmdFlags::ALL),
            })
        }
        "stream_adc_to_file" => {
            ensure_args(verb, args, 2, 2)?;
            ensure_flags(verb, flags, no_flags)?;
            Ok(StreamAdcToFile { board: parse_board(&args[0])?, path: paths::clean_and_expand(&args[1]) })
        }
        "stream_dac_from_file" => {
            ensure_args(verb, args, 2, 3)?;
            ensure_flags(verb, flags, no_flags)?;
            let loop_count =
                if args.len() == 3 { parse_ranged(&args[2], "loop count", 1, u32::MAX)? } else { 1 };
            Ok(StreamDacFromFile {
                board: parse_board(&args[0])?,
                path: paths::clean_and_expand(&args[1]),
                loop_count,
            })
        }
        "stream_adc_from_file" => {
            ensure_args(verb, args, 2, 3)?;
            ensure_flags(verb, flags, CmdFlags::SIMPLE)?;
            let loop_count =
                if args.len() == 3 { parse_ranged(&args[2], "loop count", 1, u32::MAX)? } else { 1 };
            Ok(StreamAdcFromFile {
                board: parse_board(&args[0])?,
                path: paths::clean_and_expand(&args[1]),
                loop_count,
                simple: flags.contains(CmdFlags::SIMPLE),
            })
        }
        "stop_dac_stream" => Ok(StopDacStream(board_only()?)),
        "stop_adc_stream" => Ok(StopAdcStream(board_only()?)),

        "log_commands" => {
            ensure_args(verb, args, 1, 1)?;
            ensure_flags(verb, flags, no_flags)?;
            Ok(LogCommands(paths::clean_and_expand(&args[0])))
        }
        "stop_log" => plain(StopLog),
        "load_commands" => {
            ensure_args(verb, args, 1, 1)?;
            ensure_flags(verb, flags, no_flags)?;
            Ok(LoadCommands(paths::clean_and_expand(&args[0])))
        }

        "do_dac_wr_ch" => {
            ensure_args(verb, args, 2, 2)?;
            ensure_flags(verb, flags, no_flags)?;
            let (board, channel) = parse_global_channel(&args[0])?;
            Ok(DoDacWrCh { board, channel, value: parse_sample(&args[1])? })
        }
        "do_adc_rd_ch" => {
            ensure_args(verb, args, 1, 1)?;
            ensure_flags(verb, flags, no_flags)?;
            let (board, channel) = parse_global_channel(&args[0])?;
            Ok(DoAdcRdCh { board, channel })
        }
        "read_adc_single" => {
            ensure_args(verb, args, 1, 1)?;
            ensure_flags(verb, flags, CmdFlags::ALL)?;
            let (board, channel) = parse_global_channel(&args[0])?;
            Ok(ReadAdcSingle { board, channel, all: flags.contains(CmdFlags::ALL) })
        }
        "set_and_check" | "channel_test" => {
            ensure_args(verb, args, 2, 2)?;
            ensure_flags(verb, flags, no_flags)?;
            let (board, channel) = parse_global_channel(&args[0])?;
            let value = parse_sample(&args[1])?;
            Ok(if verb == "set_and_check" {
                SetAndCheck { board, channel, value }
            } else {
                ChannelTest { board, channel, value }
            })
        }
        "waveform_test" => plain(WaveformTest),

        unknown => Err(ShimError::Config(format!(
            "unknown command '{}'; type 'help' for available commands",
            unknown
        ))),
    }
}

fn dispatch(request: Request, env: &mut CommonEnv) -> Result<Option<String>, ShimError> {
    use Request::*;
    match request {
        Help => Ok(Some(help_text())),
        Verbose => {
            env.verbose = !env.verbose;
            // Verbose mode opens up the register-level detail the control
            // ops and workers emit at debug/trace.
            log::set_max_level(if env.verbose { log::LevelFilter::Trace } else { log::LevelFilter::Info });
            Ok(Some(format!("Verbose mode is now {}.", if env.verbose { "enabled" } else { "disabled" })))
        }
        On | Off | Sts | Dbg | HardReset | Exit | SetBootTestSkip(_) | SetDebug(_) | SetCmdBufReset(_)
        | SetDataBufReset(_) | InvertMosiClk | InvertMisoClk | LogCommands(_) | StopLog | LoadCommands(_) => {
            sys::exec(request, env)
        }
        DacCmdFifoSts(_) | DacDataFifoSts(_) | AdcCmdFifoSts(_) | AdcDataFifoSts(_) | TrigCmdFifoSts
        | TrigDataFifoSts | ReadDacData { .. } | ReadAdcData { .. } | ReadTrigData { .. }
        | ReadDacDbg { .. } | ReadAdcDbg { .. } | ReadAdcToFile { .. } | ReadAdcSingle { .. } => {
            fifo::exec(request, env)
        }
        TrigSyncCh | TrigForce | TrigCancel | TrigSetLockout(_) | TrigDelay(_) | TrigExpectExt(_) => {
            trig::exec(request, env)
        }
        DacNoop { .. } | DacCancel(_) | WriteDacUpdate { .. } | DoDacWrCh { .. } => dac::exec(request, env),
        AdcNoop { .. } | AdcCancel(_) | AdcSetOrd { .. } | AdcSimpleRead { .. } | AdcRead { .. }
        | DoAdcRdCh { .. } => adc::exec(request, env),
        StreamAdcToFile { .. } | StreamDacFromFile { .. } | StreamAdcFromFile { .. } | StopDacStream(_)
        | StopAdcStream(_) => stream::exec(request, env),
        SetAndCheck { .. } | ChannelTest { .. } | WaveformTest => diag::exec(request, env),
    }
}

struct HelpEntry {
    verb: &'static str,
    usage: &'static str,
    description: &'static str,
}

const HELP: &[HelpEntry] = &[
    HelpEntry { verb: "help", usage: "", description: "Show this help message" },
    HelpEntry { verb: "verbose", usage: "", description: "Toggle verbose mode" },
    HelpEntry { verb: "on", usage: "", description: "Turn the system on" },
    HelpEntry { verb: "off", usage: "", description: "Turn the system off" },
    HelpEntry { verb: "sts", usage: "", description: "Show hardware manager status" },
    HelpEntry { verb: "dbg", usage: "", description: "Show debug registers" },
    HelpEntry {
        verb: "hard_reset",
        usage: "",
        description: "Stop all streams, turn the system off, pulse both buffer resets",
    },
    HelpEntry { verb: "exit", usage: "", description: "Exit the program" },
    HelpEntry { verb: "set_boot_test_skip", usage: "<value>", description: "Set boot test skip register (16-bit)" },
    HelpEntry { verb: "set_debug", usage: "<value>", description: "Set debug register (16-bit)" },
    HelpEntry { verb: "set_cmd_buf_reset", usage: "<mask>", description: "Set command buffer reset mask (17-bit)" },
    HelpEntry { verb: "set_data_buf_reset", usage: "<mask>", description: "Set data buffer reset mask (17-bit)" },
    HelpEntry { verb: "invert_mosi_clk", usage: "", description: "Invert MOSI SCK polarity" },
    HelpEntry { verb: "invert_miso_clk", usage: "", description: "Invert MISO SCK polarity" },
    HelpEntry { verb: "dac_cmd_fifo_sts", usage: "<board>", description: "Show DAC command FIFO status" },
    HelpEntry { verb: "dac_data_fifo_sts", usage: "<board>", description: "Show DAC data FIFO status" },
    HelpEntry { verb: "adc_cmd_fifo_sts", usage: "<board>", description: "Show ADC command FIFO status" },
    HelpEntry { verb: "adc_data_fifo_sts", usage: "<board>", description: "Show ADC data FIFO status" },
    HelpEntry { verb: "trig_cmd_fifo_sts", usage: "", description: "Show trigger command FIFO status" },
    HelpEntry { verb: "trig_data_fifo_sts", usage: "", description: "Show trigger data FIFO status" },
    HelpEntry { verb: "read_dac_data", usage: "<board> [--all]", description: "Read raw DAC data sample(s)" },
    HelpEntry { verb: "read_adc_data", usage: "<board> [--all]", description: "Read raw ADC data sample(s)" },
    HelpEntry { verb: "read_trig_data", usage: "[--all]", description: "Read 64-bit trigger data sample(s)" },
    HelpEntry { verb: "read_dac_dbg", usage: "<board> [--all]", description: "Read and decode DAC debug words" },
    HelpEntry { verb: "read_adc_dbg", usage: "<board> [--all]", description: "Read and decode ADC debug words" },
    HelpEntry { verb: "sync_ch", usage: "", description: "Send trigger synchronize channels command" },
    HelpEntry { verb: "force_trig", usage: "", description: "Send trigger force trigger command" },
    HelpEntry { verb: "trig_cancel", usage: "", description: "Send trigger cancel command" },
    HelpEntry {
        verb: "trig_set_lockout",
        usage: "<cycles>",
        description: "Send trigger set lockout command (1 - 0x1FFFFFFF)",
    },
    HelpEntry { verb: "trig_delay", usage: "<cycles>", description: "Send trigger delay command (0 - 0x1FFFFFFF)" },
    HelpEntry {
        verb: "trig_expect_ext",
        usage: "<count>",
        description: "Send trigger expect external command (0 - 0x1FFFFFFF)",
    },
    HelpEntry {
        verb: "dac_noop",
        usage: "<board> <trig|delay> <value> [--continue]",
        description: "Send DAC no-op command",
    },
    HelpEntry {
        verb: "adc_noop",
        usage: "<board> <trig|delay> <value> [--continue]",
        description: "Send ADC no-op command",
    },
    HelpEntry { verb: "dac_cancel", usage: "<board>", description: "Send DAC cancel command" },
    HelpEntry { verb: "adc_cancel", usage: "<board>", description: "Send ADC cancel command" },
    HelpEntry {
        verb: "write_dac_update",
        usage: "<board> <ch0..ch7> <trig|delay> <value> [--continue]",
        description: "Send DAC write update command with eight channel values",
    },
    HelpEntry {
        verb: "adc_set_ord",
        usage: "<board> <ord0..ord7>",
        description: "Set ADC channel order (each value 0-7)",
    },
    HelpEntry {
        verb: "adc_simple_read",
        usage: "<board> <loop_count> <delay_cycles>",
        description: "Send one ADC read command per loop iteration",
    },
    HelpEntry {
        verb: "adc_read",
        usage: "<board> <loop_count> <delay_cycles>",
        description: "Send a loop_next command followed by a single ADC read",
    },
    HelpEntry {
        verb: "read_adc_to_file",
        usage: "<board> <file> [--all]",
        description: "Read ADC data to file as signed values, one per line",
    },
    HelpEntry {
        verb: "stream_adc_to_file",
        usage: "<board> <file>",
        description: "Start streaming ADC data to a file (four words per batch)",
    },
    HelpEntry {
        verb: "stream_dac_from_file",
        usage: "<board> <file> [loop_count]",
        description: "Start DAC playback from a waveform file",
    },
    HelpEntry {
        verb: "stream_adc_from_file",
        usage: "<board> <file> [loop_count] [--simple]",
        description: "Start streaming an ADC command program",
    },
    HelpEntry { verb: "stop_dac_stream", usage: "<board>", description: "Stop DAC streaming for a board" },
    HelpEntry { verb: "stop_adc_stream", usage: "<board>", description: "Stop ADC streaming for a board" },
    HelpEntry { verb: "log_commands", usage: "<file>", description: "Start logging commands to a file" },
    HelpEntry { verb: "stop_log", usage: "", description: "Stop logging commands" },
    HelpEntry {
        verb: "load_commands",
        usage: "<file>",
        description: "Load and execute commands from a file (0.25s between commands)",
    },
    HelpEntry {
        verb: "do_dac_wr_ch",
        usage: "<channel> <value>",
        description: "Write one DAC channel (channel 0-63, board = ch/8)",
    },
    HelpEntry { verb: "do_adc_rd_ch", usage: "<channel>", description: "Read one ADC channel (channel 0-63)" },
    HelpEntry {
        verb: "read_adc_single",
        usage: "<channel> [--all]",
        description: "Read single-channel ADC data (channel 0-63)",
    },
    HelpEntry {
        verb: "set_and_check",
        usage: "<channel> <value>",
        description: "Write a DAC channel, wait, read the matching ADC channel",
    },
    HelpEntry {
        verb: "channel_test",
        usage: "<channel> <value>",
        description: "Reset board buffers, drive one channel and measure the error",
    },
    HelpEntry {
        verb: "waveform_test",
        usage: "",
        description: "Interactive waveform test: DAC/ADC files, loops, output file, lockout",
    },
];

fn help_text() -> String {
    use std::fmt::Write;
    let mut out = String::from("Available commands:\n\n -- No arguments --\n");
    for entry in HELP.iter().filter(|e| e.usage.is_empty()) {
        writeln!(out, "  {:<22} - {}", entry.verb, entry.description).unwrap();
    }
    out.push_str("\n -- With arguments --\n");
    for entry in HELP.iter().filter(|e| !e.usage.is_empty()) {
        writeln!(out, "  {} {}\n{:24} - {}", entry.verb, entry.usage, "", entry.description).unwrap();
    }
    out.push_str("\n  (prefix binary values with \"0b\", octal with \"0\", and hex with \"0x\")\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Result<Request, ShimError> {
        let (verb, args, flags) = tokenize(line).unwrap();
        parse_request(&verb, &args, flags)
    }

    #[test]
    fn single_channel_write_splits_board_and_channel() {
        assert_eq!(
            parse("do_dac_wr_ch 9 12345").unwrap(),
            Request::DoDacWrCh { board: 1, channel: 1, value: 12345 }
        );
    }

    #[test]
    fn noop_carries_mode_and_continue() {
        assert_eq!(
            parse("dac_noop 3 trig 10 --continue").unwrap(),
            Request::DacNoop { board: 3, trig: true, value: 10, cont: true }
        );
        assert_eq!(
            parse("adc_noop 0 delay 0x100").unwrap(),
            Request::AdcNoop { board: 0, trig: false, value: 256, cont: false }
        );
        assert!(parse("dac_noop 0 sometimes 10").is_err());
    }

    #[test]
    fn write_dac_update_collects_samples() {
        assert_eq!(
            parse("write_dac_update 2 1 2 3 4 5 6 7 8 delay 20").unwrap(),
            Request::WriteDacUpdate {
                board: 2,
                samples: [1, 2, 3, 4, 5, 6, 7, 8],
                trig: false,
                value: 20,
                cont: false
            }
        );
        assert!(parse("write_dac_update 2 1 2 3 delay 20").is_err());
    }

    #[test]
    fn flags_are_validated_per_verb() {
        assert!(parse("read_adc_data 3 --all").is_ok());
        assert!(parse("read_adc_data 3 --simple").is_err());
        assert!(parse("dac_cancel 1 --continue").is_err());
    }

    #[test]
    fn ranges_are_validated_at_the_boundary() {
        assert!(parse("dac_cmd_fifo_sts 8").is_err());
        assert!(parse("trig_set_lockout 0").is_err());
        assert!(parse("trig_delay 0x20000000").is_err());
        assert!(parse("set_boot_test_skip 65536").is_err());
        assert!(parse("adc_set_ord 0 0 1 2 3 4 5 6 8").is_err());
        assert!(parse("bogus_verb 1").is_err());
    }

    #[test]
    fn stream_requests_default_loop_count() {
        assert_eq!(
            parse("stream_dac_from_file 3 /tmp/wave.txt").unwrap(),
            Request::StreamDacFromFile { board: 3, path: "/tmp/wave.txt".into(), loop_count: 1 }
        );
        assert_eq!(
            parse("stream_adc_from_file 3 prog.txt 2 --simple").unwrap(),
            Request::StreamAdcFromFile {
                board: 3,
                path: "/home/shim/prog.txt".into(),
                loop_count: 2,
                simple: true
            }
        );
    }
}
