//! The operator read-eval-print loop.
//!
//! Lines come from stdin, or from a script queued by `load_commands`.
//! Script lines replay with 250 ms pacing and print as they execute; any
//! failing script line triggers a hard reset and exits the process, since a
//! bad script leaves the fabric in an unknown state.

use std::collections::VecDeque;
use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use shim_hal::{Shim, StreamEngine};

use crate::cmds::{self, CommonEnv};

const SCRIPT_PACING: Duration = Duration::from_millis(250);

struct QueuedLine {
    text: String,
    /// 1-based line number in the script, when replaying.
    script_line: Option<usize>,
}

pub fn run(shim: Arc<Shim>, engine: Arc<StreamEngine>) {
    let mut env = CommonEnv::new(shim, engine);
    let mut queue: VecDeque<QueuedLine> = VecDeque::new();
    let stdin = std::io::stdin();

    loop {
        let item = match queue.pop_front() {
            Some(item) => item,
            None => {
                print!("shim> ");
                let _ = std::io::stdout().flush();
                let mut line = String::new();
                match stdin.lock().read_line(&mut line) {
                    Ok(0) => break,
                    Ok(_) => QueuedLine { text: line.trim().to_string(), script_line: None },
                    Err(e) => {
                        log::error!("failed to read input: {}", e);
                        break;
                    }
                }
            }
        };

        if item.text.is_empty() || item.text.starts_with('#') {
            continue;
        }
        if let Some(line_no) = item.script_line {
            println!("Executing line {}: {}", line_no, item.text);
        }

        match cmds::execute_line(&item.text, &mut env) {
            Ok(Some(output)) => println!("{}", output),
            Ok(None) => {}
            Err(e) => {
                if let Some(line_no) = item.script_line {
                    println!("Invalid command at line {}: '{}' ({})", line_no, item.text, e);
                    println!("Performing hard reset and exiting...");
                    queue.clear();
                    if let Err(reset_err) = env.engine.hard_reset() {
                        log::error!("hard reset failed: {}", reset_err);
                    }
                    env.should_exit = true;
                } else {
                    println!("error: {}", e);
                }
            }
        }

        // A load_commands drops its script here; replay it before touching
        // stdin again, preserving nesting order.
        if let Some(script) = env.script.take() {
            for (line_no, text) in script.into_iter().rev() {
                queue.push_front(QueuedLine { text, script_line: Some(line_no) });
            }
        }

        if item.script_line.is_some() {
            std::thread::sleep(SCRIPT_PACING);
        }
        if env.should_exit {
            break;
        }
    }

    env.engine.stop_all();
}
