//! `circuitgen deprovision`

use anyhow::{Context as _, Result, bail};
use circuitkit::{Orchestrator, RemovalLedger, Side, TemplateRenderer};
use dialoguer::Confirm;
use std::io::IsTerminal;
use std::time::Instant;

use crate::Context;
use crate::cli::DeprovisionArgs;
use crate::config::Settings;
use crate::ui;

pub fn run(ctx: &Context, args: DeprovisionArgs) -> Result<()> {
    let started = Instant::now();

    let settings = Settings::load()?;
    let ledger_dir = settings.ledger_dir();
    let devices = &args.devices;

    // Nothing recorded for A means nothing to do; fail before any device is touched.
    let a_pending = RemovalLedger::new(&ledger_dir, &devices.a_address).records()?;
    let z_pending = match RemovalLedger::new(&ledger_dir, &devices.z_address).records() {
        Ok(records) => Some(records),
        Err(e) if e.is_ledger_missing() => None,
        Err(e) => return Err(e.into()),
    };

    if !ctx.quiet {
        ui::header("Deprovisioning test circuits");
        ui::kv(
            "A",
            &format!("{}: {} circuit(s)", devices.a_address, a_pending.len()),
        );
        ui::kv(
            "Z",
            &z_pending.as_ref().map_or_else(
                || format!("{}: no ledger", devices.z_address),
                |records| format!("{}: {} circuit(s)", devices.z_address, records.len()),
            ),
        );
        println!();
    }

    match approval(args.yes, std::io::stdin().is_terminal()) {
        Approval::Granted => {}
        Approval::Prompt => {
            if !confirm_proceed()? {
                ui::info("Aborted, nothing was removed");
                return Ok(());
            }
        }
        Approval::Unavailable => {
            bail!("stdin is not a terminal; pass --yes to deprovision without a prompt")
        }
    }

    let (mut a, mut z) = super::connect_pair(devices, &settings, ctx.quiet)?;

    let renderer = TemplateRenderer::builtin();
    let orchestrator = Orchestrator::new(&a, &z, &renderer, &ledger_dir)
        .with_push_timeout(settings.push_timeout());

    let mut removed = 0;
    let mut outcome = Ok(());
    for (num, side, address) in [
        (1, Side::A, &devices.a_address),
        (2, Side::Z, &devices.z_address),
    ] {
        if !ctx.quiet {
            ui::step(num, 2, &format!("Removing circuits from {side} side ({address})"));
        }
        match orchestrator.deprovision_side(side) {
            Ok(records) => {
                removed += records.len();
                if !ctx.quiet {
                    ui::success(&format!("Removed {} circuit(s) from {}", records.len(), address));
                }
            }
            Err(e) => {
                super::explain_device_error(&e);
                outcome = Err(e).with_context(|| format!("Deprovisioning {side} side failed"));
                break;
            }
        }
    }

    drop(orchestrator);
    super::close_pair(&mut a, &mut z);
    outcome?;

    if !ctx.quiet {
        println!();
        ui::success(&format!(
            "Deprovisioned {} circuit record(s) in {}",
            removed,
            ui::format_elapsed(started.elapsed())
        ));
    }
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum Approval {
    Granted,
    Prompt,
    Unavailable,
}

/// How the run gets permission to push removals.
fn approval(yes: bool, interactive: bool) -> Approval {
    if yes {
        Approval::Granted
    } else if interactive {
        Approval::Prompt
    } else {
        Approval::Unavailable
    }
}

/// Confirm with user
fn confirm_proceed() -> Result<bool> {
    let confirmed = Confirm::new()
        .with_prompt("Push the recorded removal configuration?")
        .default(false)
        .interact()?;

    Ok(confirmed)
}
