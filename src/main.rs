use clap::Parser;
use log::error;

use mandelzoom::config::{Args, RenderConfig};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let result = RenderConfig::from_args(&args).and_then(|config| mandelzoom::run(&config));

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(e.exit_code());
    }
}
