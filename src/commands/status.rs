use anyhow::{Context as _, Result};
use chrono::Local;
use circuitkit::{RemovalLedger, Side};

use crate::Context;
use crate::cli::DevicePair;
use crate::config::Settings;
use crate::ui;

pub fn run(ctx: &Context, args: DevicePair) -> Result<()> {
    let settings = Settings::load()?;
    let ledger_dir = settings.ledger_dir();

    ui::header("Pending removals");
    ui::kv("Ledger dir", &ledger_dir.display().to_string());

    for (side, address) in [(Side::A, &args.a_address), (Side::Z, &args.z_address)] {
        ui::section(&format!("{side} side: {address}"));

        let ledger = RemovalLedger::new(&ledger_dir, address.as_str());
        let records = match ledger.records() {
            Ok(records) => records,
            Err(e) if e.is_ledger_missing() => {
                ui::dim("nothing recorded");
                continue;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Could not read {}", ledger.path().display()));
            }
        };

        for record in &records {
            let recorded = record.recorded_at.with_timezone(&Local);
            ui::kv(
                &format!("#{}", record.seq),
                &format!(
                    "circuit {} (recorded {})",
                    record.circuit_id,
                    recorded.format("%Y-%m-%d %H:%M:%S")
                ),
            );
            if ctx.verbose > 0 {
                for line in record.removal.lines() {
                    ui::dim(line);
                }
            }
        }
    }

    println!();
    Ok(())
}
