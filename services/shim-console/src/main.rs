mod cmds;
mod repl;

use std::sync::Arc;

use shim_hal::{Shim, StreamEngine};

fn main() {
    // The logger itself accepts everything; the global max level does the
    // gating so the `verbose` command can widen it at runtime.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("trace")).init();
    log::set_max_level(log::LevelFilter::Info);

    let shim = match Shim::map() {
        Ok(shim) => Arc::new(shim),
        Err(e) => {
            // A missing mapping is fatal: nothing below can work.
            eprintln!("failed to map the shim fabric: {}", e);
            std::process::exit(1);
        }
    };
    let engine = Arc::new(StreamEngine::new(Arc::clone(&shim)));

    println!("Shim operator console. Type 'help' for available commands.");
    repl::run(shim, engine);
}
