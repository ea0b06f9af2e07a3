//! Resource scopes and filters for container logs on a compute instance.

/// Log name suffix the container-optimized OS writes container output to
pub const CONTAINER_LOG_ID: &str = "cos_containers";

/// Resource type of a compute instance
pub const INSTANCE_RESOURCE_TYPE: &str = "gce_instance";

/// Resource scope for a whole project
pub fn project_scope(project: &str) -> String {
    format!("projects/{}", project)
}

/// Filter selecting the container output of one instance
pub fn container_log_filter(project: &str, instance_id: &str) -> String {
    format!(
        "resource.type={} AND logName=projects/{}/logs/{} AND resource.labels.instance_id={}",
        INSTANCE_RESOURCE_TYPE, project, CONTAINER_LOG_ID, instance_id
    )
}

/// Full log name for `log_id` in `project`
pub fn log_name(project: &str, log_id: &str) -> String {
    format!("projects/{}/logs/{}", project, log_id)
}
