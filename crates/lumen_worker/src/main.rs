//! Lumen command worker
//!
//! Reads length-prefixed command frames on stdin and answers on stdout.
//!
//! Run with: cargo run -p lumen_worker -- --osp:verbose

use std::io::{self, BufReader, BufWriter};

use lumen_engine::Engine;
use lumen_worker::{cpu, logging, Dispatcher, PipeTransport, WorkerConfig};

fn main() {
    let (config, rest) = match WorkerConfig::load(std::env::args().collect()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("lumen-worker: {}", e);
            std::process::exit(2);
        }
    };

    let diagnostics = config.diagnostics();
    logging::init(diagnostics);
    if let Some(path) = &config.config_path {
        log::info!("Loaded config from {}", path.display());
    }
    if rest.len() > 1 {
        log::debug!("Arguments left for downstream consumers: {:?}", &rest[1..]);
    }

    if let Err(e) = run(config, diagnostics) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(config: WorkerConfig, diagnostics: lumen_worker::Diagnostics) -> Result<(), Box<dyn std::error::Error>> {
    cpu::check_sse41()?;

    let engine = Engine::init(config.engine_config())?;
    let mut dispatcher = Dispatcher::with_diagnostics(engine, diagnostics);

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut transport = PipeTransport::new(BufReader::new(stdin.lock()), BufWriter::new(stdout.lock()));
    transport.serve(&mut dispatcher)?;
    Ok(())
}
