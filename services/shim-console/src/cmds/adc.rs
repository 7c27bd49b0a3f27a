//! Direct ADC commands.

use shim_hal::ShimError;

use super::{CommonEnv, Request};

pub fn exec(request: Request, env: &mut CommonEnv) -> Result<Option<String>, ShimError> {
    match request {
        Request::AdcNoop { board, trig, value, cont } => {
            env.shim.adc_noop(board, trig, cont, value)?;
            Ok(Some(format!(
                "ADC no-op command sent to board {} in {} mode, value {}{}.",
                board,
                if trig { "trigger" } else { "delay" },
                value,
                if cont { ", continuous" } else { "" }
            )))
        }
        Request::AdcCancel(board) => {
            env.shim.adc_cancel(board)?;
            Ok(Some(format!("ADC cancel command sent to board {}.", board)))
        }
        Request::AdcSetOrd { board, order } => {
            env.shim.adc_set_order(board, &order)?;
            Ok(Some(format!("ADC channel order set for board {}: {:?}", board, order)))
        }
        Request::AdcSimpleRead { board, loop_count, delay } => {
            for _ in 0..loop_count {
                env.shim.adc_read(board, false, false, delay)?;
            }
            Ok(Some(format!(
                "Completed {} ADC read command(s) on board {} (delay mode, {} cycles).",
                loop_count, board, delay
            )))
        }
        Request::AdcRead { board, loop_count, delay } => {
            env.shim.adc_loop_next(board, loop_count)?;
            env.shim.adc_read(board, false, false, delay)?;
            Ok(Some(format!(
                "ADC read commands sent to board {}: loop_next({}) + read(delay, {}).",
                board, loop_count, delay
            )))
        }
        Request::DoAdcRdCh { board, channel } => {
            env.shim.adc_read_channel(board, channel)?;
            Ok(Some(format!("ADC read channel command sent to board {} channel {}.", board, channel)))
        }
        other => unreachable!("not an ADC request: {:?}", other),
    }
}
