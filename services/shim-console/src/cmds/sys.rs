//! System control, status, and command scripting.

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use shim_hal::ShimError;

use super::{CommonEnv, Request};

pub fn exec(request: Request, env: &mut CommonEnv) -> Result<Option<String>, ShimError> {
    match request {
        Request::On => {
            env.shim.turn_on();
            Ok(Some("System turned on.".into()))
        }
        Request::Off => {
            env.shim.turn_off();
            Ok(Some("System turned off.".into()))
        }
        Request::Sts => {
            let sts = env.shim.sys_sts.hw_status();
            let state = match sts.state() {
                Some(state) => format!("{:?}", state),
                None => format!("unknown (code {})", sts.state_code()),
            };
            Ok(Some(format!(
                "Hardware status: {} (raw 0x{:08x})\n  status code: 0x{:02x}\n  board: {}",
                state,
                sts.raw(),
                sts.status_code(),
                sts.halt_board()
            )))
        }
        Request::Dbg => {
            let dbg = env.shim.spi_clk.debug_registers();
            Ok(Some(format!(
                "Debug registers:\n  reset:  0x{:08x}  status: 0x{:08x}\n  cfg0:   0x{:08x}  cfg1:   0x{:08x}\n  phase:  0x{:08x}  duty:   0x{:08x}\n  debug:  0x{:08x}  enable: 0x{:08x}\n  mosi_sck_pol: {}  miso_sck_pol: {}",
                dbg.reset, dbg.status, dbg.cfg0, dbg.cfg1, dbg.phase, dbg.duty, dbg.debug, dbg.enable,
                dbg.mosi_sck_pol, dbg.miso_sck_pol
            )))
        }
        Request::HardReset => {
            env.engine.hard_reset()?;
            Ok(Some("Hard reset sequence completed.".into()))
        }
        Request::Exit => {
            env.should_exit = true;
            Ok(Some("Exiting program.".into()))
        }
        Request::SetBootTestSkip(value) => {
            env.shim.sys_ctrl.set_boot_test_skip(value);
            Ok(Some(format!("Boot test skip register set to 0x{:x}.", value)))
        }
        Request::SetDebug(value) => {
            env.shim.spi_clk.set_debug(value);
            Ok(Some(format!("Debug register set to 0x{:x}.", value)))
        }
        Request::SetCmdBufReset(mask) => {
            env.shim.sys_ctrl.set_cmd_buf_reset(mask)?;
            Ok(Some(format!("Command buffer reset register set to 0x{:x}.", mask)))
        }
        Request::SetDataBufReset(mask) => {
            env.shim.sys_ctrl.set_data_buf_reset(mask)?;
            Ok(Some(format!("Data buffer reset register set to 0x{:x}.", mask)))
        }
        Request::InvertMosiClk => {
            let pol = env.shim.spi_clk.invert_mosi_sck();
            Ok(Some(format!("MOSI SCK polarity inverted (now {}).", pol)))
        }
        Request::InvertMisoClk => {
            let pol = env.shim.spi_clk.invert_miso_sck();
            Ok(Some(format!("MISO SCK polarity inverted (now {}).", pol)))
        }
        Request::LogCommands(path) => log_commands(&path, env),
        Request::StopLog => {
            if env.log_file.take().is_none() {
                return Ok(Some("Command logging is not currently active.".into()));
            }
            Ok(Some("Command logging stopped.".into()))
        }
        Request::LoadCommands(path) => load_commands(&path, env),
        other => unreachable!("not a system request: {:?}", other),
    }
}

fn log_commands(path: &Path, env: &mut CommonEnv) -> Result<Option<String>, ShimError> {
    let mut note = String::new();
    if env.log_file.take().is_some() {
        note.push_str("Previous log file closed.\n");
    }
    let file = OpenOptions::new().create(true).write(true).truncate(true).open(path)?;
    if let Err(e) = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o666)) {
        log::warn!("could not set permissions on '{}': {}", path.display(), e);
    }
    env.log_file = Some(file);
    Ok(Some(format!("{}Started logging commands to '{}'.", note, path.display())))
}

/// Queue every line of a script for the REPL to replay with 250 ms pacing.
/// The REPL hard-resets and exits if any replayed line fails; a script that
/// went wrong leaves the fabric in an unknown state.
fn load_commands(path: &Path, env: &mut CommonEnv) -> Result<Option<String>, ShimError> {
    let file = std::fs::File::open(path)?;
    let mut lines = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        lines.push((idx + 1, trimmed.to_string()));
    }
    let count = lines.len();
    env.script = Some(lines);
    Ok(Some(format!("Loaded {} command(s) from '{}'.", count, path.display())))
}
