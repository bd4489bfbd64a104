//! `sk` CLI entry point.

use clap::Parser;
use skim::{write_output, SkimOptions};

fn init_logging() {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().filter_or("RUST_LOG", "warn"));
    if let Ok(spec) = std::env::var("SKIM_LOG") {
        builder.parse_filters(&spec);
    }
    builder.init();
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    init_logging();

    let mut argv: Vec<String> = std::env::args().collect();
    let prepended = skim::options::default_opts_argv();
    if !prepended.is_empty() {
        let mut merged = vec![argv.remove(0)];
        merged.extend(prepended);
        merged.extend(argv);
        argv = merged;
    }

    let options = SkimOptions::parse_from(argv).finalize();

    match skim::run_with(&options, None) {
        Ok(output) => {
            let code = write_output(&output, std::io::stdout())?;
            std::process::exit(code);
        }
        Err(e) => {
            log::error!("{e}");
            std::process::exit(2);
        }
    }
}
