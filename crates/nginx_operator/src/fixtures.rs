//! In-memory stand-ins for the API server used by unit tests.

use crate::api::v1alpha1::nginxoperator::{NginxOperator, NginxOperatorSpec};
use crate::controllers::cluster::ClusterClient;
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use kube::api::ObjectMeta;
use kube::error::ErrorResponse;
use kube::runtime::events::Event;
use std::collections::BTreeMap;
use std::sync::Mutex;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    GetNginxOperator,
    GetDeployment,
    CreateDeployment,
    ReplaceDeployment,
    PublishEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Write {
    Create(String),
    Replace(String),
}

pub fn nginx_operator(namespace: &str, name: &str, replicas: Option<i32>, port: Option<i32>) -> NginxOperator {
    NginxOperator {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            uid: Some(format!("uid-{namespace}-{name}")),
            ..Default::default()
        },
        spec: NginxOperatorSpec { replicas, port },
    }
}

pub fn api_error(code: u16, reason: &str) -> kube::Error {
    kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message: format!("injected {reason}"),
        reason: reason.to_string(),
        code,
    })
}

fn key(namespace: &str, name: &str) -> String {
    format!("{namespace}/{name}")
}

#[derive(Default)]
struct Inner {
    nginx_operators: BTreeMap<String, NginxOperator>,
    deployments: BTreeMap<String, Deployment>,
    failures: Vec<(Operation, u16)>,
    writes: Vec<Write>,
    events: Vec<String>,
    resource_version: u64,
}

impl Inner {
    fn take_failure(&mut self, op: Operation) -> Result<(), kube::Error> {
        match self.failures.iter().position(|(o, _)| *o == op) {
            Some(idx) => {
                let (_, code) = self.failures.remove(idx);
                Err(api_error(code, "Injected"))
            }
            None => Ok(()),
        }
    }

    fn next_resource_version(&mut self) -> String {
        self.resource_version += 1;
        self.resource_version.to_string()
    }
}

/// An object store keyed by namespace/name that assigns uids and resource versions and
/// rejects stale replaces with a 409.
#[derive(Default)]
pub struct InMemoryCluster {
    inner: Mutex<Inner>,
}

impl InMemoryCluster {
    pub fn add_nginx_operator(&self, nginx_operator: NginxOperator) -> NginxOperator {
        let mut inner = self.inner.lock().unwrap();
        let mut nginx_operator = nginx_operator;
        nginx_operator.metadata.resource_version = Some(inner.next_resource_version());
        let k = key(
            nginx_operator.metadata.namespace.as_deref().unwrap_or_default(),
            nginx_operator.metadata.name.as_deref().unwrap_or_default(),
        );
        inner.nginx_operators.insert(k, nginx_operator.clone());
        nginx_operator
    }

    pub fn remove_nginx_operator(&self, namespace: &str, name: &str) {
        self.inner.lock().unwrap().nginx_operators.remove(&key(namespace, name));
    }

    pub fn add_deployment(&self, deployment: Deployment) {
        let mut inner = self.inner.lock().unwrap();
        let mut deployment = deployment;
        deployment.metadata.resource_version = Some(inner.next_resource_version());
        let k = key(
            deployment.metadata.namespace.as_deref().unwrap_or_default(),
            deployment.metadata.name.as_deref().unwrap_or_default(),
        );
        inner.deployments.insert(k, deployment);
    }

    pub fn deployment(&self, namespace: &str, name: &str) -> Option<Deployment> {
        self.inner.lock().unwrap().deployments.get(&key(namespace, name)).cloned()
    }

    pub fn writes(&self) -> Vec<Write> {
        self.inner.lock().unwrap().writes.clone()
    }

    pub fn events(&self) -> Vec<String> {
        self.inner.lock().unwrap().events.clone()
    }

    /// Make the next call of `op` fail with the given HTTP status.
    pub fn fail_next(&self, op: Operation, code: u16) {
        self.inner.lock().unwrap().failures.push((op, code));
    }
}

#[async_trait]
impl ClusterClient for InMemoryCluster {
    async fn get_nginx_operator(&self, namespace: &str, name: &str) -> Result<Option<NginxOperator>, kube::Error> {
        let mut inner = self.inner.lock().unwrap();
        inner.take_failure(Operation::GetNginxOperator)?;
        Ok(inner.nginx_operators.get(&key(namespace, name)).cloned())
    }

    async fn get_deployment(&self, namespace: &str, name: &str) -> Result<Option<Deployment>, kube::Error> {
        let mut inner = self.inner.lock().unwrap();
        inner.take_failure(Operation::GetDeployment)?;
        Ok(inner.deployments.get(&key(namespace, name)).cloned())
    }

    async fn create_deployment(&self, namespace: &str, deployment: &Deployment) -> Result<Deployment, kube::Error> {
        let mut inner = self.inner.lock().unwrap();
        inner.take_failure(Operation::CreateDeployment)?;

        let name = deployment.metadata.name.clone().unwrap_or_default();
        let k = key(namespace, &name);
        if inner.deployments.contains_key(&k) {
            return Err(api_error(409, "AlreadyExists"));
        }

        let mut stored = deployment.clone();
        stored.metadata.namespace = Some(namespace.to_string());
        stored.metadata.uid = Some(format!("uid-deployment-{k}"));
        stored.metadata.resource_version = Some(inner.next_resource_version());
        inner.deployments.insert(k.clone(), stored.clone());
        inner.writes.push(Write::Create(k));
        Ok(stored)
    }

    async fn replace_deployment(
        &self,
        namespace: &str,
        name: &str,
        deployment: &Deployment,
    ) -> Result<Deployment, kube::Error> {
        let mut inner = self.inner.lock().unwrap();
        inner.take_failure(Operation::ReplaceDeployment)?;

        let k = key(namespace, name);
        let current_version = match inner.deployments.get(&k) {
            Some(current) => current.metadata.resource_version.clone(),
            None => return Err(api_error(404, "NotFound")),
        };
        if deployment.metadata.resource_version != current_version {
            return Err(api_error(409, "Conflict"));
        }

        let mut stored = deployment.clone();
        stored.metadata.resource_version = Some(inner.next_resource_version());
        inner.deployments.insert(k.clone(), stored.clone());
        inner.writes.push(Write::Replace(k));
        Ok(stored)
    }

    async fn publish_event(&self, _owner: &NginxOperator, event: Event) -> Result<(), kube::Error> {
        let mut inner = self.inner.lock().unwrap();
        inner.take_failure(Operation::PublishEvent)?;
        inner.events.push(event.reason);
        Ok(())
    }
}

/// A cluster whose API calls never complete.
pub struct HangingCluster;

#[async_trait]
impl ClusterClient for HangingCluster {
    async fn get_nginx_operator(&self, _namespace: &str, _name: &str) -> Result<Option<NginxOperator>, kube::Error> {
        std::future::pending().await
    }

    async fn get_deployment(&self, _namespace: &str, _name: &str) -> Result<Option<Deployment>, kube::Error> {
        std::future::pending().await
    }

    async fn create_deployment(&self, _namespace: &str, _deployment: &Deployment) -> Result<Deployment, kube::Error> {
        std::future::pending().await
    }

    async fn replace_deployment(
        &self,
        _namespace: &str,
        _name: &str,
        _deployment: &Deployment,
    ) -> Result<Deployment, kube::Error> {
        std::future::pending().await
    }

    async fn publish_event(&self, _owner: &NginxOperator, _event: Event) -> Result<(), kube::Error> {
        std::future::pending().await
    }
}
