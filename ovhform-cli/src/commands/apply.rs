use std::path::Path;

use anyhow::Result;
use serde_json::json;
use tracing::Instrument;
use uuid::Uuid;

use ovhform_convergence::Engine;
use ovhform_models::{DesiredResource, Outcome};

use crate::commands::build_engine;
use crate::config::Config;
use crate::manifest::Manifest;

pub async fn run(config: &Config, manifest_path: &Path, output: &str) -> Result<()> {
    let manifest = Manifest::load(manifest_path)?;
    let engine = build_engine(config)?;

    let run_id = Uuid::new_v4();
    let span = tracing::info_span!("apply", run_id = %run_id);
    async move {
        tracing::info!(
            manifest = %manifest_path.display(),
            resources = manifest.resources.len(),
            "Starting convergence run"
        );
        let (applied, failure) = converge_all(&engine, &manifest.resources).await;
        print_outcomes(&applied, output)?;

        if let Some((desired, error)) = failure {
            return Err(anyhow::Error::new(error).context(format!(
                "Failed to converge {} {}",
                desired.kind(),
                desired.display_name()
            )));
        }
        tracing::info!(
            changed = applied.iter().filter(|(_, o)| o.changed).count(),
            "Convergence run complete"
        );
        Ok::<(), anyhow::Error>(())
    }
    .instrument(span)
    .await
}

/// Converge resources in order, stopping at the first error.
async fn converge_all<'a>(
    engine: &Engine,
    resources: &'a [DesiredResource],
) -> (
    Vec<(&'a DesiredResource, Outcome)>,
    Option<(&'a DesiredResource, ovhform_convergence::ConvergeError)>,
) {
    let mut applied = Vec::with_capacity(resources.len());
    for desired in resources {
        match engine.apply(desired).await {
            Ok(outcome) => applied.push((desired, outcome)),
            Err(e) => return (applied, Some((desired, e))),
        }
    }
    (applied, None)
}

fn print_outcomes(applied: &[(&DesiredResource, Outcome)], output: &str) -> Result<()> {
    if output == "json" {
        let rendered: Vec<_> = applied
            .iter()
            .map(|(desired, outcome)| {
                json!({
                    "kind": desired.kind(),
                    "name": desired.display_name(),
                    "changed": outcome.changed,
                    "message": outcome.message,
                    "attributes": outcome.attributes,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rendered)?);
    } else {
        println!("{:<24} {:<30} {:<8} {}", "KIND", "NAME", "CHANGED", "MESSAGE");
        println!("{}", "-".repeat(100));

        for (desired, outcome) in applied {
            println!(
                "{:<24} {:<30} {:<8} {}",
                desired.kind(),
                desired.display_name(),
                if outcome.changed { "yes" } else { "no" },
                outcome.message
            );
        }

        println!();
        println!(
            "{} resource(s) converged, {} changed",
            applied.len(),
            applied.iter().filter(|(_, o)| o.changed).count()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ovhform_convergence::test_util::FakeCloud;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_first_error_stops_the_run() {
        let cloud = Arc::new(
            FakeCloud::new()
                .on_list("/domain/zone", json!(["example.com"]))
                .on_list("/domain/zone/example.com/record", json!([])),
        );
        let engine = Engine::builder().client(cloud.clone()).build().unwrap();
        let manifest = Manifest::parse(
            r#"
resources:
  - kind: dns_record
    domain: example.com
    name: www
    target: 192.0.2.1
    state: absent
  - kind: dns_record
    domain: example.org
    name: www
    target: 192.0.2.1
  - kind: dns_record
    domain: example.com
    name: api
    target: 192.0.2.2
"#,
        )
        .unwrap();

        let (applied, failure) = converge_all(&engine, &manifest.resources).await;

        assert_eq!(applied.len(), 1);
        let (failed, error) = failure.unwrap();
        assert_eq!(failed.display_name(), "www.example.org");
        assert_eq!(error.to_string(), "Domain example.org unknown");
        assert!(cloud.mutations().is_empty());
    }
}
