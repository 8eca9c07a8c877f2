use clap::Parser;
use dendromap::app::{AppConfig, DendroMapApp};

fn main() {
    let _ = env_logger::builder().format_timestamp(None).try_init();

    let config = AppConfig::parse();
    if let Err(err) = DendroMapApp::run(&config) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
