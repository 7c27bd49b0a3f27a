//! FIFO status queries and data/debug reads.

use std::fmt::Write;
use std::fs::OpenOptions;
use std::os::unix::fs::PermissionsExt;

use shim_hal::cmd::{adc, dac};
use shim_hal::{FifoStatus, ShimError};

use super::{CommonEnv, Request};

pub fn exec(request: Request, env: &mut CommonEnv) -> Result<Option<String>, ShimError> {
    match request {
        Request::DacCmdFifoSts(board) => {
            Ok(Some(fmt_fifo_status("DAC command", env.shim.sys_sts.dac_fifo_status(board))))
        }
        Request::DacDataFifoSts(board) => {
            Ok(Some(fmt_fifo_status("DAC data", env.shim.sys_sts.dac_fifo_status(board))))
        }
        Request::AdcCmdFifoSts(board) => {
            Ok(Some(fmt_fifo_status("ADC command", env.shim.sys_sts.adc_cmd_fifo_status(board))))
        }
        Request::AdcDataFifoSts(board) => {
            Ok(Some(fmt_fifo_status("ADC data", env.shim.sys_sts.adc_data_fifo_status(board))))
        }
        Request::TrigCmdFifoSts => {
            Ok(Some(fmt_fifo_status("Trigger command", env.shim.sys_sts.trig_cmd_fifo_status())))
        }
        Request::TrigDataFifoSts => {
            Ok(Some(fmt_fifo_status("Trigger data", env.shim.sys_sts.trig_data_fifo_status())))
        }
        Request::ReadDacData { board, all } => read_dac_data(board, all, env),
        Request::ReadAdcData { board, all } => read_adc_data(board, all, env),
        Request::ReadTrigData { all } => read_trig_data(all, env),
        Request::ReadDacDbg { board, all } => read_dac_dbg(board, all, env),
        Request::ReadAdcDbg { board, all } => read_adc_dbg(board, all, env),
        Request::ReadAdcToFile { board, path, all } => read_adc_to_file(board, &path, all, env),
        Request::ReadAdcSingle { board, channel, all } => read_adc_single(board, channel, all, env),
        other => unreachable!("not a FIFO request: {:?}", other),
    }
}

fn fmt_fifo_status(name: &str, sts: FifoStatus) -> String {
    if !sts.present() {
        return format!("{} FIFO status (raw 0x{:08x}): not present", name, sts.raw());
    }
    format!(
        "{} FIFO status (raw 0x{:08x}): present, {} word(s) used, {} free{}{}",
        name,
        sts.raw(),
        sts.word_count(),
        sts.free_words(),
        if sts.is_empty() { ", empty" } else { "" },
        if sts.is_full() { ", full" } else { "" },
    )
}

/// Two 16-bit halves of a data word, decimal and binary.
fn fmt_data_word(word: u32) -> String {
    let low = word as u16;
    let high = (word >> 16) as u16;
    format!("  Word 1: {} ({:016b})\n  Word 2: {} ({:016b})", low, low, high, high)
}

fn read_dac_data(board: usize, all: bool, env: &mut CommonEnv) -> Result<Option<String>, ShimError> {
    let mut out = String::new();
    let mut count = 0;
    loop {
        let word = env.shim.dac_data_pop(board)?;
        count += 1;
        writeln!(out, "Sample {} - DAC data from board {}: 0x{:08x}", count, board, word).unwrap();
        writeln!(out, "{}", fmt_data_word(word)).unwrap();
        if !all || env.shim.sys_sts.dac_fifo_status(board).is_empty() {
            break;
        }
    }
    writeln!(out, "Read {} sample(s) total.", count).unwrap();
    Ok(Some(out))
}

fn read_adc_data(board: usize, all: bool, env: &mut CommonEnv) -> Result<Option<String>, ShimError> {
    let mut out = String::new();
    let mut count = 0;
    loop {
        let word = env.shim.adc_data_pop(board)?;
        count += 1;
        writeln!(out, "Sample {} - ADC data from board {}: 0x{:08x}", count, board, word).unwrap();
        writeln!(out, "{}", fmt_data_word(word)).unwrap();
        if !all || env.shim.sys_sts.adc_data_fifo_status(board).is_empty() {
            break;
        }
    }
    writeln!(out, "Read {} sample(s) total.", count).unwrap();
    Ok(Some(out))
}

fn read_trig_data(all: bool, env: &mut CommonEnv) -> Result<Option<String>, ShimError> {
    let mut out = String::new();
    let mut count = 0;
    loop {
        let data = env.shim.trig_data_read()?;
        count += 1;
        writeln!(out, "Sample {} - Trigger data: 0x{:016x}", count, data).unwrap();
        writeln!(out, "  Low 32 bits:  0x{:08x}", data as u32).unwrap();
        writeln!(out, "  High 32 bits: 0x{:08x}", (data >> 32) as u32).unwrap();
        if !all || env.shim.sys_sts.trig_data_fifo_status().word_count() < 2 {
            break;
        }
    }
    writeln!(out, "Read {} sample(s) total.", count).unwrap();
    Ok(Some(out))
}

fn read_dac_dbg(board: usize, all: bool, env: &mut CommonEnv) -> Result<Option<String>, ShimError> {
    let mut out = String::new();
    loop {
        let word = env.shim.dac_data_pop(board)?;
        match dac::decode(word) {
            Some(decoded) => writeln!(out, "0x{:08x}: {:?}", word, decoded).unwrap(),
            None => writeln!(out, "0x{:08x}: (unrecognized)", word).unwrap(),
        }
        if !all || env.shim.sys_sts.dac_fifo_status(board).is_empty() {
            break;
        }
    }
    Ok(Some(out))
}

fn read_adc_dbg(board: usize, all: bool, env: &mut CommonEnv) -> Result<Option<String>, ShimError> {
    let mut out = String::new();
    loop {
        let word = env.shim.adc_data_pop(board)?;
        let (low, high) = adc::split_sample_word(word);
        writeln!(out, "0x{:08x}: samples {} / {}", word, low, high).unwrap();
        if !all || env.shim.sys_sts.adc_data_fifo_status(board).is_empty() {
            break;
        }
    }
    Ok(Some(out))
}

fn read_adc_to_file(
    board: usize,
    path: &std::path::Path,
    all: bool,
    env: &mut CommonEnv,
) -> Result<Option<String>, ShimError> {
    use std::io::Write as IoWrite;

    // Surface an empty or absent FIFO before creating the file.
    let sts = env.shim.sys_sts.adc_data_fifo_status(board);
    if !sts.present() {
        return Err(ShimError::FifoNotPresent { fifo: "ADC data" });
    }
    if sts.is_empty() {
        return Err(ShimError::FifoEmpty { fifo: "ADC data" });
    }

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    if let Err(e) = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o666)) {
        log::warn!("could not set permissions on '{}': {}", path.display(), e);
    }
    let mut out = std::io::BufWriter::new(file);
    let mut words = 0;
    loop {
        let word = env.shim.adc_data_pop(board)?;
        let (low, high) = adc::split_sample_word(word);
        writeln!(out, "{}", low)?;
        writeln!(out, "{}", high)?;
        words += 1;
        if !all || env.shim.sys_sts.adc_data_fifo_status(board).is_empty() {
            break;
        }
    }
    out.flush()?;
    Ok(Some(format!("Wrote {} sample(s) ({} values) to '{}'.", words, words * 2, path.display())))
}

fn read_adc_single(board: usize, channel: u8, all: bool, env: &mut CommonEnv) -> Result<Option<String>, ShimError> {
    let mut out = String::new();
    let mut count = 0;
    loop {
        let sample = env.shim.adc_pop_channel_sample(board)?;
        count += 1;
        writeln!(out, "Sample {} - ADC channel {} data: {} (0x{:04x})", count, channel, sample, sample as u16)
            .unwrap();
        if !all || env.shim.sys_sts.adc_data_fifo_status(board).is_empty() {
            break;
        }
    }
    writeln!(out, "Read {} sample(s) total.", count).unwrap();
    Ok(Some(out))
}
