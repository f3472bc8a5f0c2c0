const ALB_PREFIX: &str = "loadbalancer/app";

/// Resource id of an ARN: the part after the account segment, reduced to its
/// last `/` segment. Application load balancers keep `app/<name>/<id>`.
pub fn res_id_from_arn(arn: &str) -> &str {
    let resource = arn.splitn(6, ':').last().unwrap_or(arn);

    if let Some(name) = resource.strip_prefix("loadbalancer/") {
        if resource.starts_with(ALB_PREFIX) {
            return name;
        }
    }

    resource.rsplit('/').next().unwrap_or(resource)
}
