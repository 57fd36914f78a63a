use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "landlord",
    about = "Multi-tenant control-plane reconciliation engine",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Seed an in-memory tenant, run the reconciler in-process against mock
    /// compute/workflow providers, and print each status transition.
    Demo {
        /// Tenant name; must be lowercase alphanumeric-hyphen.
        #[arg(long, default_value = "acme-prod")]
        tenant_name: String,

        /// Path to a JSON file with the desired config. Defaults to an
        /// empty config when omitted.
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate a `TenantComputeSpec` JSON document against the same rules
    /// the compute manager enforces before provisioning.
    ValidateSpec {
        /// Path to the JSON file containing the spec.
        path: PathBuf,
    },

    /// Print the controller configuration resolved from `LANDLORD_*`
    /// environment variables (falling back to defaults).
    ConfigShow,
}
