//! Direct DAC commands.
//!
//! Every direct command is refused while the board's playback worker owns
//! the command FIFO.

use shim_hal::ShimError;

use super::{CommonEnv, Request};

fn reject_if_streaming(env: &CommonEnv, board: usize, what: &str) -> Result<(), ShimError> {
    if env.engine.dac_running(board) {
        return Err(ShimError::stream_state(format!(
            "cannot send {} to board {}: DAC stream is currently running, stop the stream first",
            what, board
        )));
    }
    Ok(())
}

pub fn exec(request: Request, env: &mut CommonEnv) -> Result<Option<String>, ShimError> {
    match request {
        Request::DacNoop { board, trig, value, cont } => {
            reject_if_streaming(env, board, "DAC no-op command")?;
            env.shim.dac_noop(board, trig, cont, value)?;
            Ok(Some(format!(
                "DAC no-op command sent to board {} in {} mode, value {}{}.",
                board,
                if trig { "trigger" } else { "delay" },
                value,
                if cont { ", continuous" } else { "" }
            )))
        }
        Request::DacCancel(board) => {
            reject_if_streaming(env, board, "DAC cancel command")?;
            env.shim.dac_cancel(board)?;
            Ok(Some(format!("DAC cancel command sent to board {}.", board)))
        }
        Request::WriteDacUpdate { board, samples, trig, value, cont } => {
            reject_if_streaming(env, board, "DAC write update command")?;
            env.shim.dac_write_update(board, trig, cont, value, &samples)?;
            Ok(Some(format!(
                "DAC write update command sent to board {} in {} mode, value {}{}.\nChannel values: {:?}",
                board,
                if trig { "trigger" } else { "delay" },
                value,
                if cont { ", continuous" } else { "" },
                samples
            )))
        }
        Request::DoDacWrCh { board, channel, value } => {
            reject_if_streaming(env, board, "DAC write channel command")?;
            env.shim.dac_write_channel(board, channel, value)?;
            Ok(Some(format!("Wrote DAC board {} channel {} with value {}.", board, channel, value)))
        }
        other => unreachable!("not a DAC request: {:?}", other),
    }
}
