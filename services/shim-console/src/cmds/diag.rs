//! Operator diagnostics: single-channel loopback checks and the interactive
//! waveform test. The fixed waits here are operator-diagnostic timing for
//! the fabric to produce a sample, not handshakes.

use std::fmt::Write;
use std::io::Write as IoWrite;
use std::time::Duration;

use shim_hal::{program, ShimError};

use super::paths;
use super::{args, CommonEnv, Request};

pub fn exec(request: Request, env: &mut CommonEnv) -> Result<Option<String>, ShimError> {
    match request {
        Request::SetAndCheck { board, channel, value } => set_and_check(board, channel, value, env),
        Request::ChannelTest { board, channel, value } => channel_test(board, channel, value, env),
        Request::WaveformTest => waveform_test(env),
        other => unreachable!("not a diagnostic request: {:?}", other),
    }
}

fn set_and_check(board: usize, channel: u8, value: i16, env: &mut CommonEnv) -> Result<Option<String>, ShimError> {
    let mut out = String::new();
    writeln!(out, "Set and check: board {}, channel {}, value {}", board, channel, value).unwrap();

    let shim = &env.shim;
    let dac_cmd = shim.sys_sts.dac_fifo_status(board);
    if !dac_cmd.present() {
        return Err(ShimError::FifoNotPresent { fifo: "DAC command" });
    }
    if !dac_cmd.is_empty() {
        return Err(ShimError::stream_state(format!("DAC command FIFO for board {} is not empty", board)));
    }
    writeln!(out, "✓ DAC command buffer for board {} is empty", board).unwrap();

    let adc_cmd = shim.sys_sts.adc_cmd_fifo_status(board);
    if !adc_cmd.present() {
        return Err(ShimError::FifoNotPresent { fifo: "ADC command" });
    }
    if !adc_cmd.is_empty() {
        return Err(ShimError::stream_state(format!("ADC command FIFO for board {} is not empty", board)));
    }
    writeln!(out, "✓ ADC command buffer for board {} is empty", board).unwrap();

    let adc_data = shim.sys_sts.adc_data_fifo_status(board);
    if !adc_data.present() {
        return Err(ShimError::FifoNotPresent { fifo: "ADC data" });
    }
    if !adc_data.is_empty() {
        return Err(ShimError::stream_state(format!("ADC data FIFO for board {} is not empty", board)));
    }
    writeln!(out, "✓ ADC data buffer for board {} is empty", board).unwrap();

    shim.dac_write_channel(board, channel, value)?;
    writeln!(out, "Wrote DAC channel, waiting 500ms...").unwrap();
    std::thread::sleep(Duration::from_millis(500));

    shim.adc_read_channel(board, channel)?;
    std::thread::sleep(Duration::from_millis(10));

    if shim.sys_sts.adc_data_fifo_status(board).is_empty() {
        return Err(ShimError::FifoEmpty { fifo: "ADC data" });
    }
    let sample = shim.adc_pop_channel_sample(board)?;
    writeln!(out, "✓ Read ADC channel data: {} (0x{:04x})", sample, sample as u16).unwrap();
    writeln!(out, "Set and check completed successfully.").unwrap();
    Ok(Some(out))
}

fn channel_test(board: usize, channel: u8, value: i16, env: &mut CommonEnv) -> Result<Option<String>, ShimError> {
    let mut out = String::new();
    writeln!(out, "=== Channel Test ===").unwrap();
    writeln!(out, "Board {}, channel {}, target value {}", board, channel, value).unwrap();

    let shim = &env.shim;
    let hw = shim.sys_sts.hw_status();
    if !hw.is_running() {
        return Err(ShimError::stream_state(format!(
            "system is not running (state code 0x{:x}); turn the system on first",
            hw.state_code()
        )));
    }
    writeln!(out, "✓ System is running").unwrap();

    let mask = 1 << board;
    shim.sys_ctrl.set_cmd_buf_reset(mask)?;
    shim.sys_ctrl.set_data_buf_reset(mask)?;
    std::thread::sleep(Duration::from_millis(1));
    shim.sys_ctrl.set_cmd_buf_reset(0)?;
    shim.sys_ctrl.set_data_buf_reset(0)?;
    writeln!(out, "✓ Buffers reset for board {}", board).unwrap();

    shim.dac_write_channel(board, channel, value)?;
    shim.adc_noop(board, false, false, 100_000)?;
    shim.adc_read_channel(board, channel)?;
    std::thread::sleep(Duration::from_millis(10));

    if shim.sys_sts.adc_data_fifo_status(board).is_empty() {
        return Err(ShimError::FifoEmpty { fifo: "ADC data" });
    }
    let measured = shim.adc_pop_channel_sample(board)?;
    let error = measured as i32 - value as i32;
    writeln!(out, "✓ Read ADC value: {} (0x{:04x})", measured, measured as u16).unwrap();
    writeln!(out, "Target value:   {}", value).unwrap();
    writeln!(out, "Measured value: {}", measured).unwrap();
    writeln!(out, "Absolute error: {}", error).unwrap();
    if value != 0 {
        writeln!(out, "Percent error:  {:.2}%", error as f64 / value as f64 * 100.0).unwrap();
    }
    writeln!(out, "=== Channel Test Complete ===").unwrap();
    Ok(Some(out))
}

fn prompt(message: &str) -> Result<String, ShimError> {
    print!("{}", message);
    std::io::stdout().flush()?;
    let mut line = String::new();
    if std::io::stdin().read_line(&mut line)? == 0 {
        return Err(ShimError::Config("unexpected end of input".into()));
    }
    Ok(line.trim().to_string())
}

/// Interactive combined test: resets all buffers, then prompts for a board,
/// DAC and ADC program files, a loop count, an output file and a trigger
/// lockout, arms the trigger engine, and starts DAC playback, the ADC
/// program stream and the ADC capture on the chosen board.
fn waveform_test(env: &mut CommonEnv) -> Result<Option<String>, ShimError> {
    println!("=== Waveform Test ===");
    println!("This interactive test runs DAC and ADC waveforms together.\n");

    let shim = &env.shim;
    shim.sys_ctrl.set_cmd_buf_reset(shim_hal::sys_ctrl::BUF_RESET_MASK)?;
    shim.sys_ctrl.set_data_buf_reset(shim_hal::sys_ctrl::BUF_RESET_MASK)?;
    std::thread::sleep(Duration::from_millis(1));
    shim.sys_ctrl.set_cmd_buf_reset(0)?;
    shim.sys_ctrl.set_data_buf_reset(0)?;
    println!("✓ All buffers reset\n");

    let board = args::parse_board(&prompt("Enter board number (0-7): ")?)?;

    let dac_path = paths::clean_and_expand(&prompt("Enter DAC waveform file path: ")?);
    let dac_commands = program::parse_waveform_file(&dac_path)?;
    let trigger_lines = dac_commands.iter().filter(|c| c.trig).count() as u32;
    println!("✓ DAC file parsed: {} commands, {} trigger lines", dac_commands.len(), trigger_lines);

    let adc_path = paths::clean_and_expand(&prompt("Enter ADC program file path: ")?);
    let adc_commands = program::parse_adc_program_file(&adc_path)?;
    println!("✓ ADC file parsed: {} commands", adc_commands.len());

    let loops = args::parse_ranged(&prompt("Enter number of loops: ")?, "loop count", 1, u32::MAX)?;
    let output_path = paths::clean_and_expand(&prompt("Enter output file path: ")?);
    let lockout =
        args::parse_ranged(&prompt("Enter trigger lockout time (cycles): ")?, "lockout cycles", 1, 0x1FFF_FFFF)?;

    let total_triggers = trigger_lines * loops;
    println!("\n=== Configuration Summary ===");
    println!("Board: {}", board);
    println!("DAC file: {} ({} commands, {} triggers)", dac_path.display(), dac_commands.len(), trigger_lines);
    println!("ADC file: {} ({} commands)", adc_path.display(), adc_commands.len());
    println!("Output file: {}", output_path.display());
    println!("Loops: {}, lockout: {} cycles, expected triggers: {}\n", loops, lockout, total_triggers);

    shim.trig_set_lockout(lockout)?;
    shim.trig_expect_ext(total_triggers)?;

    env.engine.start_dac_playback(board, dac_commands, loops)?;
    env.engine.start_adc_program(board, adc_commands, loops, false)?;
    env.engine.start_adc_capture(board, output_path.clone())?;

    Ok(Some(format!(
        "=== Waveform Test Running ===\nDAC and ADC are streaming on board {}.\nMonitor the output file '{}'; use 'stop_dac_stream {}' and 'stop_adc_stream {}' to stop.",
        board,
        output_path.display(),
        board,
        board
    )))
}
