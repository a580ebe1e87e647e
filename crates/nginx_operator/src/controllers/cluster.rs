//! Access to the cluster object store used by the reconciler.

use crate::api::v1alpha1::nginxoperator::NginxOperator;
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use kube::{
    api::{Api, PostParams},
    client::Client,
    runtime::events::{Event, Recorder, Reporter},
    Resource,
};

pub const FIELD_MANAGER: &str = "nginx-operator";

/// Reads and writes against the API server, keyed by namespace/name.
///
/// Gets return `Ok(None)` when the object does not exist. Replace carries the object's
/// `resourceVersion`, so a stale write fails with a 409.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    async fn get_nginx_operator(&self, namespace: &str, name: &str) -> Result<Option<NginxOperator>, kube::Error>;

    async fn get_deployment(&self, namespace: &str, name: &str) -> Result<Option<Deployment>, kube::Error>;

    async fn create_deployment(&self, namespace: &str, deployment: &Deployment) -> Result<Deployment, kube::Error>;

    async fn replace_deployment(
        &self,
        namespace: &str,
        name: &str,
        deployment: &Deployment,
    ) -> Result<Deployment, kube::Error>;

    async fn publish_event(&self, owner: &NginxOperator, event: Event) -> Result<(), kube::Error>;
}

/// `ClusterClient` backed by a real `kube::Client`.
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
    reporter: Reporter,
}

impl KubeClusterClient {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            reporter: FIELD_MANAGER.into(),
        }
    }

    fn post_params() -> PostParams {
        PostParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn get_nginx_operator(&self, namespace: &str, name: &str) -> Result<Option<NginxOperator>, kube::Error> {
        let api: Api<NginxOperator> = Api::namespaced(self.client.clone(), namespace);
        api.get_opt(name).await
    }

    async fn get_deployment(&self, namespace: &str, name: &str) -> Result<Option<Deployment>, kube::Error> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
        api.get_opt(name).await
    }

    async fn create_deployment(&self, namespace: &str, deployment: &Deployment) -> Result<Deployment, kube::Error> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
        api.create(&Self::post_params(), deployment).await
    }

    async fn replace_deployment(
        &self,
        namespace: &str,
        name: &str,
        deployment: &Deployment,
    ) -> Result<Deployment, kube::Error> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
        api.replace(name, &Self::post_params(), deployment).await
    }

    async fn publish_event(&self, owner: &NginxOperator, event: Event) -> Result<(), kube::Error> {
        let recorder = Recorder::new(self.client.clone(), self.reporter.clone());
        recorder.publish(&event, &owner.object_ref(&())).await
    }
}
