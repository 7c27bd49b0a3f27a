//! Stream start/stop commands.

use shim_hal::program;
use shim_hal::ShimError;

use super::{CommonEnv, Request};

pub fn exec(request: Request, env: &mut CommonEnv) -> Result<Option<String>, ShimError> {
    match request {
        Request::StreamDacFromFile { board, path, loop_count } => {
            let commands = program::parse_waveform_file(&path)?;
            let count = commands.len();
            env.engine.start_dac_playback(board, commands, loop_count)?;
            Ok(Some(format!(
                "Started DAC streaming for board {} from '{}' ({} commands, looping {} time{}).",
                board,
                path.display(),
                count,
                loop_count,
                if loop_count == 1 { "" } else { "s" }
            )))
        }
        Request::StopDacStream(board) => {
            env.engine.stop_dac_playback(board)?;
            Ok(Some(format!("DAC streaming for board {} has been stopped.", board)))
        }
        Request::StreamAdcToFile { board, path } => {
            let shown = path.display().to_string();
            env.engine.start_adc_capture(board, path)?;
            Ok(Some(format!("Started ADC streaming for board {} to '{}'.", board, shown)))
        }
        Request::StreamAdcFromFile { board, path, loop_count, simple } => {
            let commands = program::parse_adc_program_file(&path)?;
            let count = commands.len();
            env.engine.start_adc_program(board, commands, loop_count, simple)?;
            Ok(Some(format!(
                "Started ADC command streaming for board {} from '{}' ({} commands, looping {} time{}){}.",
                board,
                path.display(),
                count,
                loop_count,
                if loop_count == 1 { "" } else { "s" },
                if simple { " in simple mode" } else { "" }
            )))
        }
        // One verb stops whichever ADC workers the board is running; the
        // capture and program streams occupy separate slots.
        Request::StopAdcStream(board) => {
            let capture = env.engine.adc_capture_running(board);
            let program = env.engine.adc_program_running(board);
            if !capture && !program {
                return Err(ShimError::stream_state(format!(
                    "ADC stream for board {} is not running",
                    board
                )));
            }
            if capture {
                env.engine.stop_adc_capture(board)?;
            }
            if program {
                env.engine.stop_adc_program(board)?;
            }
            Ok(Some(format!("ADC streaming for board {} has been stopped.", board)))
        }
        other => unreachable!("not a stream request: {:?}", other),
    }
}
