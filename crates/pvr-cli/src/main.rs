use pvr_core::logging;

mod cli;

fn main() {
    // Log to the state-dir file when possible; otherwise stderr.
    if logging::init_logging().is_err() {
        logging::init_logging_stderr();
    }

    if let Err(err) = cli::run() {
        eprintln!("pvr error: {:#}", err);
        std::process::exit(1);
    }
}
