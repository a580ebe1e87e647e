use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Generate the Kubernetes wrapper struct `NginxOperator` from our Spec
///
/// This provides a hook for generating the CRD yaml (in crdgen)
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(
    kind = "NginxOperator",
    group = "operator.example.com",
    version = "v1alpha1",
    namespaced
)]
#[kube(shortname = "nginxop")]
pub struct NginxOperatorSpec {
    /// Number of nginx pods. The template default is kept when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,

    /// Container port nginx listens on. The template default is kept when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<i32>,
}
