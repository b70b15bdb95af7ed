mod cli;
mod logging;
mod surface;

use answerflow_core::core::StreamError;

fn main() {
    if let Err(e) = cli::run() {
        match e.downcast_ref::<StreamError>() {
            Some(StreamError::Cancelled) => std::process::exit(130),
            // The answer surface already reported it.
            Some(StreamError::Transport(_)) => std::process::exit(2),
            None => {}
        }
        eprintln!("{e:#}"); // pretty anyhow chain
        std::process::exit(1);
    }
}
