//! Learn a Q-table from a trial corpus and print it
//!
//! ```sh
//! RUST_LOG=info cargo run --example learn_corpus -- path/to/Trials 13/0/0/-
//! ```

use std::{env, process::ExitCode};

use coinbag_td::{Learner, State};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = env::args().skip(1);
    let Some(corpus) = args.next() else {
        eprintln!("usage: learn_corpus <corpus-dir> [state]");
        return ExitCode::FAILURE;
    };
    let state = args.next().unwrap_or_else(|| String::from("13/0/0/-"));

    let learner = match Learner::build(&corpus) {
        Ok(learner) => learner,
        Err(e) => {
            log::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    println!("Learned Q-function:");
    for (state, action, value) in learner.table().sorted() {
        println!("  ({state}, {action}): {value:.6}");
    }

    match state.parse::<State>() {
        Ok(state) => {
            println!("\nBest action for {state}: {}", learner.policy(&state));
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
