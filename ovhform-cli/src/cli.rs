use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ovhform_models::ClusterEngine;

/// ovhform - converge OVH cloud resources to a declared state
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Write logs to this file instead of stderr (overrides OVHFORM_LOG_FILE)
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub mode: Mode,
}

#[derive(Subcommand, Debug)]
pub enum Mode {
    /// Converge every resource of a manifest, in document order
    Apply {
        /// YAML manifest with a `resources:` list
        manifest: PathBuf,

        /// Output format (table or json)
        #[arg(short, long, default_value = "table")]
        output: String,
    },

    /// Look up a single remote resource by name
    Info {
        #[command(subcommand)]
        target: InfoTarget,

        /// Output format (table or json)
        #[arg(short, long, default_value = "table", global = true)]
        output: String,
    },

    /// Show the effective configuration
    Config {
        /// Show actual secret values (use with caution)
        #[arg(long)]
        show_secrets: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum InfoTarget {
    /// Instance flavor of a region
    Flavor {
        /// Public cloud project id
        #[arg(long)]
        service_name: String,
        #[arg(long)]
        region: String,
        name: String,
    },

    /// Image (or snapshot) of a region
    Image {
        #[arg(long)]
        service_name: String,
        #[arg(long)]
        region: String,
        name: String,
    },

    /// Compute instance
    Instance {
        #[arg(long)]
        service_name: String,
        name: String,
    },

    /// Block storage volume
    Volume {
        #[arg(long)]
        service_name: String,
        #[arg(long)]
        region: String,
        name: String,
    },

    /// Managed database cluster, by description
    Cluster {
        #[arg(long)]
        service_name: String,
        /// Database engine (kafka, mongodb, mysql, opensearch, postgresql, redis)
        #[arg(long = "type")]
        engine: ClusterEngine,
        name: String,
    },
}
