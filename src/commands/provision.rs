//! `circuitgen provision`

use anyhow::{Context as _, Result};
use circuitkit::{CircuitEnd, Monitoring, Orchestrator, ProvisionRequest, TemplateRenderer};
use colored::Colorize;
use std::time::Instant;

use crate::Context;
use crate::cli::ProvisionArgs;
use crate::config::Settings;
use crate::progress::CircuitProgress;
use crate::ui;

pub fn run(ctx: &Context, args: ProvisionArgs) -> Result<()> {
    let started = Instant::now();

    let settings = Settings::load()?;
    let template_dir = settings.template_dir()?;
    let renderer = TemplateRenderer::from_dir(&template_dir)
        .with_context(|| format!("Could not load templates from {}", template_dir.display()))?;
    let ledger_dir = settings.ledger_dir();

    let request = ProvisionRequest {
        count: args.count as usize,
        a_end: CircuitEnd::new(args.a_loopback, args.a_interface),
        z_end: CircuitEnd::new(args.z_loopback, args.z_interface),
        monitoring: Monitoring {
            ccm_interval_secs: args.ccm_interval,
            hw_offload: args.hw_offload,
            ..Monitoring::default()
        },
        dry_run: args.dry_run,
    };

    if !ctx.quiet {
        ui::header("Provisioning test circuits");
        ui::kv(
            "A",
            &format!("{} ({})", args.devices.a_address, request.a_end.interface),
        );
        ui::kv(
            "Z",
            &format!("{} ({})", args.devices.z_address, request.z_end.interface),
        );
        ui::kv("Circuits", &args.count.to_string());
        ui::kv("Mode", if args.dry_run { "dry run" } else { "live" });
        println!();
    }

    if args.dry_run && args.count > 1 {
        ui::warn("Dry runs do not change the devices, so every circuit gets the same ids");
    }

    if args.count == 0 {
        if !ctx.quiet {
            ui::info("Nothing to provision");
        }
        return Ok(());
    }

    let (mut a, mut z) = super::connect_pair(&args.devices, &settings, ctx.quiet)?;

    let progress = CircuitProgress::new(args.count.into(), ctx.quiet);
    let orchestrator = Orchestrator::new(&a, &z, &renderer, &ledger_dir)
        .with_push_timeout(settings.push_timeout());
    let result = orchestrator.provision(&request, &progress);
    let ledger_location = orchestrator.ledger_dir().display().to_string();
    progress.finish();
    drop(orchestrator);
    super::close_pair(&mut a, &mut z);

    let report = match result {
        Ok(report) => report,
        Err(e) if e.is_asymmetric() => {
            ui::error(&e.to_string());
            super::explain_device_error(&e);
            ui::dim(&format!(
                "Remove the A half with: circuitgen deprovision {} {}",
                args.devices.a_address, args.devices.z_address
            ));
            return Err(e.into());
        }
        Err(e) => {
            super::explain_device_error(&e);
            return Err(e).context("Provisioning failed");
        }
    };

    if ctx.quiet {
        return Ok(());
    }

    let elapsed = ui::format_elapsed(started.elapsed());
    if args.dry_run {
        ui::success(&format!(
            "Rendered {} circuit(s) in {}",
            report.circuits.len(),
            elapsed
        ));
        for path in &report.dry_run_files {
            ui::kv("Written", &path.display().to_string());
        }
    } else {
        ui::success(&format!(
            "Provisioned {} circuit(s) in {}",
            report.circuits.len().to_string().bold(),
            elapsed
        ));
        ui::kv("Ledger", &ledger_location);
    }

    Ok(())
}
