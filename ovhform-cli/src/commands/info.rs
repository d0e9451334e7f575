use anyhow::Result;
use serde_json::Value;

use ovhform_models::ClusterRef;

use crate::cli::InfoTarget;
use crate::commands::build_engine;
use crate::config::Config;

pub async fn run(config: &Config, target: InfoTarget, output: &str) -> Result<()> {
    let engine = build_engine(config)?;
    let lookup = engine.lookup();

    let (title, record) = match target {
        InfoTarget::Flavor { service_name, region, name } => {
            (format!("Flavor: {}", name), lookup.flavor(&service_name, &region, &name).await?)
        }
        InfoTarget::Image { service_name, region, name } => {
            (format!("Image: {}", name), lookup.image(&service_name, &region, &name).await?)
        }
        InfoTarget::Instance { service_name, name } => {
            (format!("Instance: {}", name), lookup.instance(&service_name, &name).await?)
        }
        InfoTarget::Volume { service_name, region, name } => {
            (format!("Block storage: {}", name), lookup.volume(&service_name, &region, &name).await?)
        }
        InfoTarget::Cluster { service_name, engine, name } => {
            let cluster = ClusterRef { service_name, engine, name };
            let record = lookup.cluster(&cluster).await?;
            (format!("Cluster: {} ({})", cluster.name, cluster.engine), record)
        }
    };

    if output == "json" {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        println!("{}", title);
        println!("{}", "=".repeat(60));
        print_fields(&record);
    }

    Ok(())
}

/// Top-level fields, one per line; nested values are shown as JSON.
fn print_fields(record: &Value) {
    let Some(fields) = record.as_object() else {
        println!("{}", record);
        return;
    };
    for (key, value) in fields {
        let rendered = match value {
            Value::String(s) => s.clone(),
            Value::Null => "-".to_string(),
            other => other.to_string(),
        };
        println!("  {:<22} {}", format!("{}:", key), rendered);
    }
}
