pub mod app_error;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod envfile;
pub mod logging;
pub mod model;
pub mod output;
pub mod simulation;
pub mod store;
pub mod tracker;
pub mod version;

pub fn run() -> i32 {
    logging::init();

    match cli::run_cli() {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("{err}");
            err.code()
        }
    }
}
