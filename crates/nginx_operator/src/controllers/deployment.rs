use crate::{
    api::v1alpha1::nginxoperator::{NginxOperator, NginxOperatorSpec},
    assets::DeploymentTemplate,
    controllers::cluster::ClusterClient,
    util::errors::{is_api_status, Error, ErrorWithRequeue, Result, StdError},
};

use k8s_openapi::{api::apps::v1::Deployment, apimachinery::pkg::apis::meta::v1::OwnerReference};
use kube::Resource;
use tokio::time::Duration;
use tracing::{debug, info};

/// What a reconcile pass did to the cluster.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The NginxOperator no longer exists; its Deployment is left to garbage collection.
    ResourceGone,
    Created,
    Updated,
}

impl ReconcileOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileOutcome::ResourceGone => "gone",
            ReconcileOutcome::Created => "create",
            ReconcileOutcome::Updated => "update",
        }
    }
}

/// Converge the Deployment `namespace/name` towards the NginxOperator of the same key.
///
/// A conflicting update is returned as `Error::ErrorWithRequeue` with `conflict_requeue`.
pub async fn reconcile(
    cluster: &dyn ClusterClient,
    template: &DeploymentTemplate,
    namespace: &str,
    name: &str,
    conflict_requeue: Duration,
) -> Result<ReconcileOutcome> {
    let nginx_operator = match cluster.get_nginx_operator(namespace, name).await? {
        Some(nginx_operator) => nginx_operator,
        None => {
            info!("NginxOperator '{}/{}' not found, nothing to do", namespace, name);
            return Ok(ReconcileOutcome::ResourceGone);
        }
    };

    let (mut deployment, create) = match cluster.get_deployment(namespace, name).await? {
        Some(existing) => (existing, false),
        None => {
            debug!("Deployment '{}/{}' not found, seeding from template", namespace, name);
            (template.instantiate(), true)
        }
    };

    deployment.metadata.namespace = Some(namespace.to_string());
    deployment.metadata.name = Some(name.to_string());

    apply_spec(&mut deployment, &nginx_operator.spec)?;
    set_controller_reference(&nginx_operator, &mut deployment)?;

    let written = if create {
        info!("Creating Deployment '{}/{}'", namespace, name);
        cluster.create_deployment(namespace, &deployment).await
    } else {
        info!("Updating Deployment '{}/{}'", namespace, name);
        cluster.replace_deployment(namespace, name, &deployment).await
    };

    match written {
        Ok(_) if create => Ok(ReconcileOutcome::Created),
        Ok(_) => Ok(ReconcileOutcome::Updated),
        Err(e) if is_api_status(&e, 409) => Err(Error::ErrorWithRequeue(ErrorWithRequeue::new(
            StdError::KubeError(e),
            conflict_requeue,
        ))),
        Err(e) => Err(e.into()),
    }
}

/// Copy the optional replica count and container port onto the Deployment.
pub fn apply_spec(deployment: &mut Deployment, spec: &NginxOperatorSpec) -> Result<(), StdError> {
    if spec.replicas.is_none() && spec.port.is_none() {
        return Ok(());
    }

    let deployment_spec = deployment
        .spec
        .as_mut()
        .ok_or_else(|| StdError::InvalidTemplate("deployment has no spec".to_string()))?;

    if let Some(replicas) = spec.replicas {
        deployment_spec.replicas = Some(replicas);
    }

    if let Some(port) = spec.port {
        let container = deployment_spec
            .template
            .spec
            .as_mut()
            .and_then(|pod| pod.containers.first_mut())
            .ok_or_else(|| StdError::InvalidTemplate("deployment has no containers".to_string()))?;
        let container_port = container
            .ports
            .as_mut()
            .and_then(|ports| ports.first_mut())
            .ok_or_else(|| {
                StdError::InvalidTemplate(format!("container '{}' declares no ports", container.name))
            })?;
        container_port.container_port = port;
    }

    Ok(())
}

/// Make `owner` the managing controller of `deployment`.
///
/// Fails when a different controller already owns the object. A reference to the same
/// owner is replaced in place rather than duplicated.
pub fn set_controller_reference(owner: &NginxOperator, deployment: &mut Deployment) -> Result<(), StdError> {
    let oref: OwnerReference = owner.controller_owner_ref(&()).ok_or_else(|| {
        StdError::MetadataMissing("NginxOperator must have a name and uid to own objects".to_string())
    })?;

    let refs = deployment.metadata.owner_references.get_or_insert_with(Vec::new);

    if let Some(other) = refs
        .iter()
        .find(|r| r.controller == Some(true) && r.uid != oref.uid)
    {
        return Err(StdError::OwnershipConflict(format!(
            "Deployment is already controlled by {} '{}'",
            other.kind, other.name
        )));
    }

    match refs.iter_mut().find(|r| r.uid == oref.uid) {
        Some(existing) => *existing = oref,
        None => refs.push(oref),
    }

    Ok(())
}
