use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "circuitgen")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(
    about = "Provision and deprovision test L2VPN circuits on a pair of IOS-XE devices",
    long_about = None
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Provision n test circuits between an A and a Z device
    Provision(ProvisionArgs),

    /// Remove every recorded test circuit from both devices
    Deprovision(DeprovisionArgs),

    /// Show circuits recorded for removal, without contacting the devices
    Status(DevicePair),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Clone, Args)]
pub struct DevicePair {
    /// Address of the A device
    pub a_address: String,

    /// Address of the Z device
    pub z_address: String,
}

#[derive(Debug, Clone, Args)]
pub struct ProvisionArgs {
    #[command(flatten)]
    pub devices: DevicePair,

    /// Number of circuits to provision (0 does nothing)
    pub count: u32,

    /// Loopback of the A device, targeted by the Z side pseudowire
    #[arg(long = "a-loopback")]
    pub a_loopback: String,

    /// Loopback of the Z device, targeted by the A side pseudowire
    #[arg(long = "z-loopback")]
    pub z_loopback: String,

    /// Interface on the A device to create service instances under
    #[arg(long = "a-interface")]
    pub a_interface: String,

    /// Interface on the Z device to create service instances under
    #[arg(long = "z-interface")]
    pub z_interface: String,

    /// CCM transmit interval in seconds
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..))]
    pub ccm_interval: u32,

    /// Enable CCM hardware offload
    #[arg(long)]
    pub hw_offload: bool,

    /// Write the configuration to <address>_dry-run.cfg instead of pushing it
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Args)]
pub struct DeprovisionArgs {
    #[command(flatten)]
    pub devices: DevicePair,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_provision() {
        let cli = Cli::try_parse_from([
            "circuitgen",
            "provision",
            "192.0.2.1",
            "192.0.2.2",
            "3",
            "--a-loopback",
            "10.0.0.1",
            "--z-loopback",
            "10.0.0.2",
            "--a-interface",
            "Gi0/0/1",
            "--z-interface",
            "Gi0/0/2",
            "--dry-run",
        ])
        .unwrap();

        match cli.command {
            Command::Provision(args) => {
                assert_eq!(args.devices.a_address, "192.0.2.1");
                assert_eq!(args.count, 3);
                assert_eq!(args.z_loopback, "10.0.0.2");
                assert_eq!(args.ccm_interval, 10);
                assert!(args.dry_run);
                assert!(!args.hw_offload);
            }
            _ => panic!("expected provision"),
        }
    }

    #[test]
    fn test_provision_requires_termination_flags() {
        let result = Cli::try_parse_from(["circuitgen", "provision", "192.0.2.1", "192.0.2.2", "1"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_provision_accepts_zero_count() {
        let result = Cli::try_parse_from([
            "circuitgen",
            "provision",
            "192.0.2.1",
            "192.0.2.2",
            "0",
            "--a-loopback",
            "10.0.0.1",
            "--z-loopback",
            "10.0.0.2",
            "--a-interface",
            "Gi0/0/1",
            "--z-interface",
            "Gi0/0/2",
        ]);
        match result.unwrap().command {
            Command::Provision(args) => assert_eq!(args.count, 0),
            _ => panic!("expected provision"),
        }
    }

    #[test]
    fn test_parse_deprovision_with_global_flags() {
        let cli =
            Cli::try_parse_from(["circuitgen", "-vv", "deprovision", "192.0.2.1", "192.0.2.2", "--yes"])
                .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Deprovision(args) => {
                assert_eq!(args.devices.z_address, "192.0.2.2");
                assert!(args.yes);
            }
            _ => panic!("expected deprovision"),
        }
    }
}
