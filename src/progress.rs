//! Progress indicators for circuitgen.

use circuitkit::{ProvisionObserver, ProvisionedCircuit, Side};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Create a spinner with a message
pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Create a bar counting circuits
pub fn circuit_bar(count: u64) -> ProgressBar {
    let pb = ProgressBar::new(count);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("=>-"));
    }
    pb
}

/// Drives a progress bar from provisioning callbacks.
pub struct CircuitProgress {
    bar: ProgressBar,
}

impl CircuitProgress {
    pub fn new(count: u64, quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            circuit_bar(count)
        };
        Self { bar }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProvisionObserver for CircuitProgress {
    fn circuit_started(&self, index: usize, count: usize) {
        self.bar
            .set_message(format!("allocating circuit {index} of {count}"));
    }

    fn side_committed(&self, side: Side, circuit_id: &str) {
        self.bar
            .set_message(format!("circuit {circuit_id}: {side} side pushed"));
    }

    fn circuit_finished(&self, circuit: &ProvisionedCircuit) {
        self.bar.inc(1);
        self.bar.println(format!(
            "  circuit {} vlan {} probes {}/{}",
            circuit.circuit_id, circuit.vlan, circuit.probes.slm, circuit.probes.dmm
        ));
    }
}
