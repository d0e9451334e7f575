//! Path templates for the cloud API resource hierarchy
//!
//! Project-scoped resources live under `/cloud/project/{service_name}`.

/// Block storage and the resources a volume references
pub mod volume {
    pub fn collection(project: &str) -> String {
        format!("/cloud/project/{}/volume", project)
    }

    pub fn item(project: &str, volume_id: &str) -> String {
        format!("/cloud/project/{}/volume/{}", project, volume_id)
    }

    pub fn upsize(project: &str, volume_id: &str) -> String {
        format!("/cloud/project/{}/volume/{}/upsize", project, volume_id)
    }

    pub fn attach(project: &str, volume_id: &str) -> String {
        format!("/cloud/project/{}/volume/{}/attach", project, volume_id)
    }

    pub fn detach(project: &str, volume_id: &str) -> String {
        format!("/cloud/project/{}/volume/{}/detach", project, volume_id)
    }

    pub fn images(project: &str) -> String {
        format!("/cloud/project/{}/image", project)
    }

    pub fn image(project: &str, image_id: &str) -> String {
        format!("/cloud/project/{}/image/{}", project, image_id)
    }

    pub fn snapshots(project: &str) -> String {
        format!("/cloud/project/{}/snapshot", project)
    }

    pub fn snapshot(project: &str, snapshot_id: &str) -> String {
        format!("/cloud/project/{}/snapshot/{}", project, snapshot_id)
    }
}

/// Compute instances
pub mod instance {
    pub fn collection(project: &str) -> String {
        format!("/cloud/project/{}/instance", project)
    }

    pub fn item(project: &str, instance_id: &str) -> String {
        format!("/cloud/project/{}/instance/{}", project, instance_id)
    }

    pub fn monthly_billing(project: &str, instance_id: &str) -> String {
        format!(
            "/cloud/project/{}/instance/{}/activeMonthlyBilling",
            project, instance_id
        )
    }

    pub fn flavors(project: &str) -> String {
        format!("/cloud/project/{}/flavor", project)
    }

    pub fn flavor(project: &str, flavor_id: &str) -> String {
        format!("/cloud/project/{}/flavor/{}", project, flavor_id)
    }

    pub fn ssh_keys(project: &str) -> String {
        format!("/cloud/project/{}/sshkey", project)
    }
}

/// Managed databases
pub mod database {
    use ovhform_models::ClusterEngine;

    pub fn availability(project: &str) -> String {
        format!("/cloud/project/{}/database/availability", project)
    }

    pub fn clusters(project: &str, engine: ClusterEngine) -> String {
        format!("/cloud/project/{}/database/{}", project, engine)
    }

    pub fn cluster(project: &str, engine: ClusterEngine, cluster_id: &str) -> String {
        format!("/cloud/project/{}/database/{}/{}", project, engine, cluster_id)
    }

    pub fn users(project: &str, engine: ClusterEngine, cluster_id: &str) -> String {
        format!("{}/user", cluster(project, engine, cluster_id))
    }

    pub fn user(project: &str, engine: ClusterEngine, cluster_id: &str, user_id: &str) -> String {
        format!("{}/user/{}", cluster(project, engine, cluster_id), user_id)
    }

    pub fn reset_credentials(
        project: &str,
        engine: ClusterEngine,
        cluster_id: &str,
        user_id: &str,
    ) -> String {
        format!("{}/credentials/reset", user(project, engine, cluster_id, user_id))
    }

    pub fn ip_restrictions(project: &str, engine: ClusterEngine, cluster_id: &str) -> String {
        format!("{}/ipRestriction", cluster(project, engine, cluster_id))
    }
}

/// DNS zones
pub mod domain {
    pub const ZONES: &str = "/domain/zone";

    pub fn records(zone: &str) -> String {
        format!("/domain/zone/{}/record", zone)
    }

    pub fn record(zone: &str, record_id: &str) -> String {
        format!("/domain/zone/{}/record/{}", zone, record_id)
    }

    pub fn refresh(zone: &str) -> String {
        format!("/domain/zone/{}/refresh", zone)
    }
}

/// IP blocks
pub mod ip {
    /// `block` must already be URL-encoded.
    pub fn reverse(block: &str, ip: &str) -> String {
        format!("/ip/{}/reverse/{}", block, ip)
    }

    pub fn reverses(block: &str) -> String {
        format!("/ip/{}/reverse", block)
    }
}
