//! Coherence-engine trace-driving CLI.
//!
//! This binary provides a single entry point for replaying a JSON trace of
//! direct-network commands and inbound coherence messages (cleanup,
//! multi-ack) through a [`mc_core::Controller`], for manual inspection of
//! directory/table behavior outside of a real many-core fabric. It:
//! 1. Loads an optional JSON `Config` (falling back to `Config::default()`).
//! 2. Loads a JSON trace file: an ordered list of events.
//! 3. Feeds each event through the controller, printing the response (or
//!    silence, for deferred transactions) as it goes.
//! 4. Prints the final observable-counter set (§6.5) and RERROR state.

use std::collections::HashMap;
use std::path::PathBuf;
use std::{fs, process};

use clap::Parser;
use serde::Deserialize;

use mc_core::common::addr::Addr;
use mc_core::common::error::McError;
use mc_core::common::packet::{Clack, Cleanup, Command, InvalPacket, MultiAck, UpdatePacket};
use mc_core::controller::ports::{CoherencePort, XramPort};
use mc_core::Config;
use mc_core::Controller;

#[derive(Parser, Debug)]
#[command(
    name = "mc-cli",
    author,
    version,
    about = "Directory-based cache-coherence engine trace driver",
    long_about = "Replay a JSON trace of direct-network commands and coherence \
messages through the coherence controller and print each response.\n\n\
Example:\n  mc-cli --trace trace.json\n  mc-cli --trace trace.json --config config.json --quiet"
)]
struct Cli {
    /// JSON trace file: an ordered array of events.
    #[arg(long)]
    trace: PathBuf,

    /// Optional JSON config file; falls back to `Config::default()`.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Suppress per-event response printing; only the final stats are shown.
    #[arg(long, default_value_t = false)]
    quiet: bool,
}

/// One entry of a trace file: a direct-network command or an inbound
/// coherence message (§6.1, §6.4).
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum TraceEvent {
    /// A direct-network command (read, write, CAS, LL, SC).
    Command(Command),
    /// An L1 cache reporting it dropped a copy.
    Cleanup(Cleanup),
    /// An L1 cache acknowledging one multi-update flit.
    MultiAck(MultiAck),
}

fn main() {
    let cli = Cli::parse();
    run(&cli);
}

fn run(cli: &Cli) {
    let config = match &cli.config {
        Some(path) => load_config(path),
        None => Config::default(),
    };

    let trace = load_trace(&cli.trace);

    let mut ctl = Controller::new(config, InMemoryXram::default(), LoggingCoherence);

    println!("Loaded {} trace event(s)", trace.len());
    for (i, event) in trace.into_iter().enumerate() {
        let rsp = match event {
            TraceEvent::Command(cmd) => ctl.command(&cmd),
            TraceEvent::Cleanup(pkt) => ctl.cleanup(pkt),
            TraceEvent::MultiAck(pkt) => ctl.multi_ack(pkt),
        };
        if cli.quiet {
            continue;
        }
        match rsp {
            Some(rsp) => match serde_json::to_string(&rsp) {
                Ok(json) => println!("[{i}] -> {json}"),
                Err(e) => println!("[{i}] -> <unserializable response: {e}>"),
            },
            None => println!("[{i}] -> (deferred)"),
        }
    }

    println!();
    println!("{:#?}", ctl.stats());
    println!("{:#?}", ctl.error_regs());
}

fn load_config(path: &PathBuf) -> Config {
    let text = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading config {}: {e}", path.display());
        process::exit(1);
    });
    serde_json::from_str(&text).unwrap_or_else(|e| {
        eprintln!("Error parsing config {}: {e}", path.display());
        process::exit(1);
    })
}

fn load_trace(path: &PathBuf) -> Vec<TraceEvent> {
    let text = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading trace {}: {e}", path.display());
        process::exit(1);
    });
    serde_json::from_str(&text).unwrap_or_else(|e| {
        eprintln!("Error parsing trace {}: {e}", path.display());
        process::exit(1);
    })
}

/// A flat, line-addressed in-memory stand-in for XRAM (§6.3): every line is
/// zero until written. This drives traces for manual inspection; it is not
/// a model of XRAM latency or error injection.
#[derive(Debug, Default)]
struct InMemoryXram {
    lines: HashMap<u64, Vec<u32>>,
}

impl XramPort for InMemoryXram {
    fn get(&mut self, addr: Addr, plen: u32) -> Result<Vec<u32>, McError> {
        let nwords = (plen / 4) as usize;
        Ok(self
            .lines
            .get(&addr.val())
            .cloned()
            .unwrap_or_else(|| vec![0; nwords]))
    }

    fn put(&mut self, addr: Addr, data: &[u32]) {
        self.lines.insert(addr.val(), data.to_vec());
    }
}

/// A coherence-network port that logs every outbound message instead of
/// delivering it to real L1 caches, since this CLI has none to drive.
#[derive(Debug, Default)]
struct LoggingCoherence;

impl CoherencePort for LoggingCoherence {
    fn send_inval(&mut self, pkt: InvalPacket) {
        println!("  cc_send_inval: {pkt:?}");
    }

    fn send_update(&mut self, pkt: UpdatePacket) {
        println!("  cc_send_update: {pkt:?}");
    }

    fn send_clack(&mut self, pkt: Clack) {
        println!("  cc_send_clack: {pkt:?}");
    }
}
