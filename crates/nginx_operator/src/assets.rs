//! Baseline nginx Deployment used to seed newly created Deployments.

use crate::util::errors::StdError;
use k8s_openapi::api::apps::v1::Deployment;
use std::fmt;
use std::path::PathBuf;
use tracing::info;

/// Manifest compiled into the binary, used when no manifest path is configured.
pub const EMBEDDED_DEPLOYMENT_MANIFEST: &str = include_str!("../assets/nginx_deployment.yaml");

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TemplateSource {
    Embedded,
    File(PathBuf),
}

impl fmt::Display for TemplateSource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TemplateSource::Embedded => write!(f, "embedded manifest"),
            TemplateSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// An immutable, parsed Deployment manifest.
#[derive(Clone, Debug)]
pub struct DeploymentTemplate {
    deployment: Deployment,
}

impl DeploymentTemplate {
    pub fn load(source: &TemplateSource) -> Result<Self, StdError> {
        let template = match source {
            TemplateSource::Embedded => Self::from_yaml(EMBEDDED_DEPLOYMENT_MANIFEST)?,
            TemplateSource::File(path) => {
                let yaml = std::fs::read_to_string(path).map_err(|source| StdError::ManifestRead {
                    path: path.clone(),
                    source,
                })?;
                Self::from_yaml(&yaml)?
            }
        };
        info!("Loaded nginx deployment template from {}", source);
        Ok(template)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, StdError> {
        let value: serde_yaml::Value = serde_yaml::from_str(yaml).map_err(StdError::ManifestParse)?;

        if let Some(api_version) = value.get("apiVersion").and_then(|v| v.as_str()) {
            if api_version != "apps/v1" {
                return Err(StdError::InvalidTemplate(format!(
                    "expected apiVersion apps/v1, got {api_version}"
                )));
            }
        }
        if let Some(kind) = value.get("kind").and_then(|v| v.as_str()) {
            if kind != "Deployment" {
                return Err(StdError::InvalidTemplate(format!("expected kind Deployment, got {kind}")));
            }
        }

        let deployment: Deployment = serde_yaml::from_value(value).map_err(StdError::ManifestParse)?;
        Ok(Self::from_deployment(deployment))
    }

    pub fn from_deployment(deployment: Deployment) -> Self {
        Self { deployment }
    }

    pub fn deployment(&self) -> &Deployment {
        &self.deployment
    }

    /// A fresh copy to be created in the cluster, stripped of server-assigned metadata.
    pub fn instantiate(&self) -> Deployment {
        let mut deployment = self.deployment.clone();
        let meta = &mut deployment.metadata;
        meta.resource_version = None;
        meta.uid = None;
        meta.creation_timestamp = None;
        meta.generation = None;
        meta.managed_fields = None;
        meta.owner_references = None;
        deployment.status = None;
        deployment
    }
}
