//! Per-board streaming workers.
//!
//! Three worker kinds per board: DAC playback (waveform file into the DAC
//! command FIFO), ADC capture (ADC data FIFO into a text file) and the ADC
//! program stream (parsed ADC commands into the ADC command FIFO). Each
//! occupies one slot holding the `running`/`stop_request` latches and the
//! join handle. The orchestrator sets `stop_request`; the worker polls it
//! before every push and inside every backpressure wait, and clears
//! `running` on its way out. Stopping joins the worker before reporting the
//! stream stopped.

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::cmd::{adc, dac};
use crate::error::{Result, ShimError};
use crate::program::{AdcProgramCommand, WaveformCommand};
use crate::regmap::NUM_BOARDS;
use crate::shim::Shim;
use crate::sys_ctrl::BUF_RESET_MASK;

/// Poll interval while waiting for FIFO space or data.
const BACKPRESSURE_POLL: Duration = Duration::from_micros(100);
/// Poll interval while the ADC command FIFO reports full.
const FULL_POLL: Duration = Duration::from_millis(1);

/// State of one stream: a `running` flag written by the worker on exit, a
/// one-way `stop` latch written by the orchestrator, and the join handle.
pub struct StreamSlot {
    running: AtomicBool,
    stop: AtomicBool,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl StreamSlot {
    fn new() -> StreamSlot {
        StreamSlot { running: AtomicBool::new(false), stop: AtomicBool::new(false), handle: Mutex::new(None) }
    }

    pub fn is_running(&self) -> bool { self.running.load(Ordering::Acquire) }

    fn stop_requested(&self) -> bool { self.stop.load(Ordering::Acquire) }

    fn request_stop(&self) { self.stop.store(true, Ordering::Release) }

    /// Claim the slot for a new worker. Fails if one is already running;
    /// reaps the handle of a worker that exited on its own.
    fn begin(&self, what: &str) -> Result<()> {
        if self.running.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_err() {
            return Err(ShimError::stream_state(format!("{} is already running", what)));
        }
        self.stop.store(false, Ordering::Release);
        if let Some(stale) = self.handle.lock().unwrap().take() {
            let _ = stale.join();
        }
        Ok(())
    }

    fn finish(&self) { self.running.store(false, Ordering::Release) }

    fn adopt(&self, handle: JoinHandle<()>) { *self.handle.lock().unwrap() = Some(handle) }

    fn join(&self) {
        if let Some(handle) = self.handle.lock().unwrap().take() {
            let _ = handle.join();
        }
    }
}

/// Encode one waveform command with the continue bit the stream assigns.
pub fn encode_waveform_command(command: &WaveformCommand, cont: bool) -> Result<Vec<u32>> {
    match &command.samples {
        Some(samples) => Ok(dac::write_update(command.trig, cont, command.value, samples)?.to_vec()),
        None => Ok(vec![dac::noop(command.trig, cont, command.value)?]),
    }
}

/// Host-side unrolling of `L` commands for simple mode: each loop repeats
/// the following command and consumes it from the outer walk. A trailing
/// `L`, or an `L` priming another `L`, primes nothing.
pub fn expand_simple(commands: &[AdcProgramCommand]) -> Vec<AdcProgramCommand> {
    let mut plan = Vec::new();
    let mut i = 0;
    while i < commands.len() {
        match commands[i] {
            AdcProgramCommand::Loop(count) => {
                match commands.get(i + 1) {
                    Some(AdcProgramCommand::Loop(_)) | None => {
                        log::warn!("loop command primes no repeatable command; ignored");
                    }
                    Some(&next) => {
                        for _ in 0..count {
                            plan.push(next);
                        }
                    }
                }
                i += 2;
            }
            command => {
                plan.push(command);
                i += 1;
            }
        }
    }
    plan
}

pub struct StreamEngine {
    shim: Arc<Shim>,
    dac: [Arc<StreamSlot>; NUM_BOARDS],
    adc_capture: [Arc<StreamSlot>; NUM_BOARDS],
    adc_program: [Arc<StreamSlot>; NUM_BOARDS],
}

impl StreamEngine {
    pub fn new(shim: Arc<Shim>) -> StreamEngine {
        StreamEngine {
            shim,
            dac: std::array::from_fn(|_| Arc::new(StreamSlot::new())),
            adc_capture: std::array::from_fn(|_| Arc::new(StreamSlot::new())),
            adc_program: std::array::from_fn(|_| Arc::new(StreamSlot::new())),
        }
    }

    pub fn shim(&self) -> &Arc<Shim> { &self.shim }

    pub fn dac_running(&self, board: usize) -> bool { self.dac[board].is_running() }

    pub fn adc_capture_running(&self, board: usize) -> bool { self.adc_capture[board].is_running() }

    pub fn adc_program_running(&self, board: usize) -> bool { self.adc_program[board].is_running() }

    fn spawn_worker(
        slot: &Arc<StreamSlot>,
        name: String,
        body: impl FnOnce() + Send + 'static,
    ) -> Result<()> {
        let worker_slot = Arc::clone(slot);
        let spawned = std::thread::Builder::new().name(name).spawn(move || {
            body();
            worker_slot.finish();
        });
        match spawned {
            Ok(handle) => {
                slot.adopt(handle);
                Ok(())
            }
            Err(e) => {
                slot.finish();
                Err(e.into())
            }
        }
    }

    // ---------- DAC playback ----------

    pub fn start_dac_playback(&self, board: usize, commands: Vec<WaveformCommand>, loop_count: u32) -> Result<()> {
        if !self.shim.sys_sts.dac_fifo_status(board).present() {
            return Err(ShimError::FifoNotPresent { fifo: "DAC command" });
        }
        let slot = &self.dac[board];
        slot.begin(&format!("DAC stream for board {}", board))?;
        let shim = Arc::clone(&self.shim);
        let worker_slot = Arc::clone(slot);
        Self::spawn_worker(slot, format!("dac-stream-{}", board), move || {
            log::info!(
                "DAC stream for board {}: started ({} commands, {} loops)",
                board,
                commands.len(),
                loop_count
            );
            match dac_playback_loop(&shim, &worker_slot, board, &commands, loop_count) {
                Ok(()) => log::info!("DAC stream for board {}: done", board),
                Err(e) => log::error!("DAC stream for board {}: {}", board, e),
            }
        })
    }

    pub fn stop_dac_playback(&self, board: usize) -> Result<()> {
        let slot = &self.dac[board];
        if !slot.is_running() {
            return Err(ShimError::stream_state(format!("DAC stream for board {} is not running", board)));
        }
        slot.request_stop();
        slot.join();
        Ok(())
    }

    // ---------- ADC capture ----------

    pub fn start_adc_capture(&self, board: usize, path: PathBuf) -> Result<()> {
        if !self.shim.sys_sts.adc_data_fifo_status(board).present() {
            return Err(ShimError::FifoNotPresent { fifo: "ADC data" });
        }
        let slot = &self.adc_capture[board];
        slot.begin(&format!("ADC capture for board {}", board))?;
        let shim = Arc::clone(&self.shim);
        let worker_slot = Arc::clone(slot);
        Self::spawn_worker(slot, format!("adc-capture-{}", board), move || {
            log::info!("ADC capture for board {}: streaming to '{}'", board, path.display());
            match adc_capture_loop(&shim, &worker_slot, board, &path) {
                Ok(samples) => log::info!("ADC capture for board {}: wrote {} samples", board, samples),
                Err(e) => log::error!("ADC capture for board {}: {}", board, e),
            }
        })
    }

    pub fn stop_adc_capture(&self, board: usize) -> Result<()> {
        let slot = &self.adc_capture[board];
        if !slot.is_running() {
            return Err(ShimError::stream_state(format!("ADC capture for board {} is not running", board)));
        }
        slot.request_stop();
        slot.join();
        Ok(())
    }

    // ---------- ADC program stream ----------

    pub fn start_adc_program(
        &self,
        board: usize,
        commands: Vec<AdcProgramCommand>,
        loop_count: u32,
        simple_mode: bool,
    ) -> Result<()> {
        if !self.shim.sys_sts.adc_cmd_fifo_status(board).present() {
            return Err(ShimError::FifoNotPresent { fifo: "ADC command" });
        }
        let slot = &self.adc_program[board];
        slot.begin(&format!("ADC program stream for board {}", board))?;
        let shim = Arc::clone(&self.shim);
        let worker_slot = Arc::clone(slot);
        Self::spawn_worker(slot, format!("adc-stream-{}", board), move || {
            log::info!(
                "ADC program stream for board {}: started ({} commands, {} loops{})",
                board,
                commands.len(),
                loop_count,
                if simple_mode { ", simple mode" } else { "" }
            );
            match adc_program_loop(&shim, &worker_slot, board, &commands, loop_count, simple_mode) {
                Ok(()) => log::info!("ADC program stream for board {}: done", board),
                Err(e) => log::error!("ADC program stream for board {}: {}", board, e),
            }
        })
    }

    pub fn stop_adc_program(&self, board: usize) -> Result<()> {
        let slot = &self.adc_program[board];
        if !slot.is_running() {
            return Err(ShimError::stream_state(format!(
                "ADC program stream for board {} is not running",
                board
            )));
        }
        slot.request_stop();
        slot.join();
        Ok(())
    }

    // ---------- lifecycle ----------

    /// Request a stop on every running worker, then join them all.
    pub fn stop_all(&self) {
        for slots in [&self.dac, &self.adc_capture, &self.adc_program] {
            for slot in slots.iter() {
                if slot.is_running() {
                    slot.request_stop();
                }
            }
        }
        for slots in [&self.dac, &self.adc_capture, &self.adc_program] {
            for slot in slots.iter() {
                slot.join();
            }
        }
    }

    /// The full recovery sequence: stop and join every stream, disable the
    /// system, clear the debug and boot-test-skip words, pulse both buffer
    /// resets across all boards and the trigger engine.
    pub fn hard_reset(&self) -> Result<()> {
        log::info!("hard reset: stopping all streams");
        self.stop_all();
        self.shim.sys_ctrl.turn_off();
        self.shim.spi_clk.set_debug(0);
        self.shim.sys_ctrl.set_boot_test_skip(0);
        self.shim.sys_ctrl.set_cmd_buf_reset(BUF_RESET_MASK)?;
        self.shim.sys_ctrl.set_data_buf_reset(BUF_RESET_MASK)?;
        self.shim.sys_ctrl.set_cmd_buf_reset(0)?;
        self.shim.sys_ctrl.set_data_buf_reset(0)?;
        log::info!("hard reset complete");
        Ok(())
    }
}

fn dac_playback_loop(
    shim: &Shim,
    slot: &StreamSlot,
    board: usize,
    commands: &[WaveformCommand],
    loop_count: u32,
) -> Result<()> {
    let fifo = shim.dac_fifo(board);
    let last_lap = loop_count.saturating_sub(1);
    for lap in 0..loop_count {
        for (idx, command) in commands.iter().enumerate() {
            let needed = command.words_needed();
            loop {
                if slot.stop_requested() {
                    log::info!("DAC stream for board {}: stop requested", board);
                    return Ok(());
                }
                let sts = shim.sys_sts.dac_fifo_status(board);
                if !sts.present() {
                    return Err(ShimError::WorkerAbort(format!(
                        "DAC command FIFO for board {} is no longer present",
                        board
                    )));
                }
                if sts.free_words() >= needed {
                    break;
                }
                std::thread::sleep(BACKPRESSURE_POLL);
            }
            // The sequence ends only with the last command of the last lap;
            // everything before it continues.
            let cont = !(lap == last_lap && idx == commands.len() - 1);
            for word in encode_waveform_command(command, cont)? {
                fifo.push(word);
            }
        }
        log::trace!("DAC stream for board {}: lap {}/{} complete", board, lap + 1, loop_count);
    }
    Ok(())
}

fn adc_capture_loop(shim: &Shim, slot: &StreamSlot, board: usize, path: &Path) -> Result<u64> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    if let Err(e) = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o666)) {
        log::warn!("could not set permissions on '{}': {}", path.display(), e);
    }
    let mut out = BufWriter::new(file);
    let fifo = shim.adc_fifo(board);
    let mut samples_written = 0u64;
    while !slot.stop_requested() {
        let sts = shim.sys_sts.adc_data_fifo_status(board);
        if !sts.present() {
            return Err(ShimError::WorkerAbort(format!(
                "ADC data FIFO for board {} is no longer present",
                board
            )));
        }
        // Samples arrive in aligned bursts of four words (eight samples);
        // reading whole bursts keeps the file from splitting one mid-stream.
        let burst = sts.word_count() / 4 * 4;
        if burst == 0 {
            std::thread::sleep(BACKPRESSURE_POLL);
            continue;
        }
        for _ in 0..burst {
            let (low, high) = adc::split_sample_word(fifo.pop());
            writeln!(out, "{}", low)?;
            writeln!(out, "{}", high)?;
        }
        out.flush()?;
        samples_written += 2 * burst as u64;
        log::trace!("ADC capture for board {}: {} words read, {} samples total", board, burst, samples_written);
    }
    out.flush()?;
    Ok(samples_written)
}

fn adc_program_loop(
    shim: &Shim,
    slot: &StreamSlot,
    board: usize,
    commands: &[AdcProgramCommand],
    loop_count: u32,
    simple_mode: bool,
) -> Result<()> {
    let plan = if simple_mode { expand_simple(commands) } else { commands.to_vec() };
    let fifo = shim.adc_fifo(board);
    for _lap in 0..loop_count {
        for command in &plan {
            loop {
                if slot.stop_requested() {
                    log::info!("ADC program stream for board {}: stop requested", board);
                    return Ok(());
                }
                let sts = shim.sys_sts.adc_cmd_fifo_status(board);
                if !sts.present() {
                    return Err(ShimError::WorkerAbort(format!(
                        "ADC command FIFO for board {} is no longer present",
                        board
                    )));
                }
                if !sts.is_full() {
                    break;
                }
                std::thread::sleep(FULL_POLL);
            }
            let word = match *command {
                AdcProgramCommand::Loop(count) => adc::loop_next(count)?,
                AdcProgramCommand::Noop { trig, value } => adc::noop(trig, false, value)?,
                AdcProgramCommand::SetOrder(order) => adc::set_order(&order)?,
            };
            fifo.push(word);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::dac::DacCommand;

    fn engine() -> StreamEngine { StreamEngine::new(Arc::new(Shim::anon())) }

    #[test]
    fn slot_rejects_double_begin() {
        let slot = StreamSlot::new();
        slot.begin("test stream").unwrap();
        assert!(slot.is_running());
        assert!(slot.begin("test stream").is_err());
        slot.finish();
        assert!(slot.begin("test stream").is_ok());
    }

    #[test]
    fn stop_without_running_stream_is_informational() {
        let engine = engine();
        assert!(matches!(engine.stop_dac_playback(2), Err(ShimError::StreamState(_))));
        assert!(matches!(engine.stop_adc_capture(0), Err(ShimError::StreamState(_))));
        assert!(matches!(engine.stop_adc_program(7), Err(ShimError::StreamState(_))));
    }

    #[test]
    fn start_refuses_absent_fifo_without_spawning() {
        let engine = engine();
        let commands = vec![WaveformCommand { trig: false, value: 1, samples: None }];
        assert!(matches!(
            engine.start_dac_playback(4, commands, 1),
            Err(ShimError::FifoNotPresent { .. })
        ));
        assert!(!engine.dac_running(4));
        assert!(matches!(
            engine.start_adc_capture(4, PathBuf::from("/tmp/na")),
            Err(ShimError::FifoNotPresent { .. })
        ));
        assert!(!engine.adc_capture_running(4));
    }

    #[test]
    fn playback_sequence_sets_continue_on_all_but_the_final_command() {
        // Two-line waveform played twice: four commands, only the very last
        // one ends the sequence.
        let commands = vec![
            WaveformCommand { trig: false, value: 10, samples: None },
            WaveformCommand { trig: true, value: 20, samples: Some([1, 2, 3, 4, 5, 6, 7, 8]) },
        ];
        let loop_count = 2u32;
        let mut pushed = Vec::new();
        for lap in 0..loop_count {
            for (idx, command) in commands.iter().enumerate() {
                let cont = !(lap == loop_count - 1 && idx == commands.len() - 1);
                pushed.push(encode_waveform_command(command, cont).unwrap());
            }
        }
        assert_eq!(pushed.len(), 4);
        assert_eq!(pushed[0].len(), 1);
        assert_eq!(pushed[1].len(), 5);
        assert_eq!(
            dac::decode(pushed[0][0]),
            Some(DacCommand::Noop { trig: false, cont: true, value: 10 })
        );
        assert_eq!(
            dac::decode(pushed[1][0]),
            Some(DacCommand::WriteUpdateHeader { trig: true, cont: true, value: 20 })
        );
        assert_eq!(
            dac::decode(pushed[2][0]),
            Some(DacCommand::Noop { trig: false, cont: true, value: 10 })
        );
        assert_eq!(
            dac::decode(pushed[3][0]),
            Some(DacCommand::WriteUpdateHeader { trig: true, cont: false, value: 20 })
        );
        assert_eq!(
            dac::decode_channels(&[pushed[3][1], pushed[3][2], pushed[3][3], pushed[3][4]]),
            [1, 2, 3, 4, 5, 6, 7, 8]
        );
    }

    #[test]
    fn simple_mode_unrolls_loops() {
        let program = vec![AdcProgramCommand::Loop(3), AdcProgramCommand::Noop { trig: false, value: 50 }];
        assert_eq!(
            expand_simple(&program),
            vec![AdcProgramCommand::Noop { trig: false, value: 50 }; 3]
        );

        let program = vec![
            AdcProgramCommand::Noop { trig: true, value: 1 },
            AdcProgramCommand::Loop(2),
            AdcProgramCommand::SetOrder([0, 1, 2, 3, 4, 5, 6, 7]),
            AdcProgramCommand::Noop { trig: false, value: 9 },
        ];
        assert_eq!(
            expand_simple(&program),
            vec![
                AdcProgramCommand::Noop { trig: true, value: 1 },
                AdcProgramCommand::SetOrder([0, 1, 2, 3, 4, 5, 6, 7]),
                AdcProgramCommand::SetOrder([0, 1, 2, 3, 4, 5, 6, 7]),
                AdcProgramCommand::Noop { trig: false, value: 9 },
            ]
        );

        // A trailing loop primes nothing.
        let program = vec![AdcProgramCommand::Noop { trig: false, value: 5 }, AdcProgramCommand::Loop(4)];
        assert_eq!(expand_simple(&program), vec![AdcProgramCommand::Noop { trig: false, value: 5 }]);
    }
}
