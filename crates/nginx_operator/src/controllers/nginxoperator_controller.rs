use crate::api::v1alpha1::nginxoperator::NginxOperator;
use crate::assets::DeploymentTemplate;
use crate::controllers::cluster::{ClusterClient, KubeClusterClient};
use crate::controllers::deployment::{self, ReconcileOutcome};
use crate::util::config::Config;
use crate::util::{errors, errors::Result, metrics};
use chrono::{DateTime, Utc};
use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use kube::{
    api::{Api, ListParams, ResourceExt},
    client::Client,
    runtime::{
        controller::{self, Action, Controller},
        events::{Event, EventType},
        watcher,
    },
};
use serde::Serialize;
use std::sync::Arc;
use tokio::{sync::RwLock, time::Duration};
use tracing::*;

/// State shared between the controller and the web server
#[derive(Clone, Default)]
pub struct State {
    /// Diagnostics populated by the reconciler
    diagnostics: Arc<RwLock<Diagnostics>>,
    /// Metrics registry
    registry: prometheus::Registry,
}

/// State wrapper around the controller outputs for the web server
impl State {
    /// Metrics getter
    pub fn metrics(&self) -> Vec<prometheus::proto::MetricFamily> {
        self.registry.gather()
    }

    /// State getter
    pub async fn diagnostics(&self) -> Diagnostics {
        self.diagnostics.read().await.clone()
    }

    // Create a Controller Context that can update State
    pub fn to_context(
        &self,
        cluster: Arc<dyn ClusterClient>,
        template: DeploymentTemplate,
        config: &Config,
    ) -> Result<Arc<Context>, prometheus::Error> {
        Ok(Arc::new(Context {
            cluster,
            template: Arc::new(template),
            metrics: metrics::Metrics::default().register(&self.registry)?,
            diagnostics: self.diagnostics.clone(),
            reconcile_timeout: config.reconcile_timeout,
            error_requeue: config.error_requeue,
            conflict_requeue: config.conflict_requeue,
        }))
    }
}

// Context for our reconciler
#[derive(Clone)]
pub struct Context {
    /// Access to the API server
    pub cluster: Arc<dyn ClusterClient>,
    /// Baseline for newly created Deployments
    pub template: Arc<DeploymentTemplate>,
    /// Diagnostics read by the web server
    pub diagnostics: Arc<RwLock<Diagnostics>>,
    /// Prometheus metrics
    pub metrics: metrics::Metrics,
    pub reconcile_timeout: Duration,
    pub error_requeue: Duration,
    pub conflict_requeue: Duration,
}

/// Diagnostics to be exposed by the web server
#[derive(Clone, Serialize)]
pub struct Diagnostics {
    pub last_event: DateTime<Utc>,
    pub last_outcome: Option<String>,
    pub last_error: Option<String>,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self {
            last_event: Utc::now(),
            last_outcome: None,
            last_error: None,
        }
    }
}

pub async fn reconcile(nginx_operator: Arc<NginxOperator>, ctx: Arc<Context>) -> Result<Action> {
    let _timer = ctx.metrics.count_and_measure(&nginx_operator.name_any());
    ctx.diagnostics.write().await.last_event = Utc::now();

    let ns = nginx_operator
        .namespace()
        .ok_or_else(|| errors::StdError::MetadataMissing("NginxOperator is namespace scoped".to_string()))?;
    let name = nginx_operator.name_any();

    info!("Reconciling NginxOperator \"{}\" in {}", name, ns);

    let pass = deployment::reconcile(
        ctx.cluster.as_ref(),
        &ctx.template,
        &ns,
        &name,
        ctx.conflict_requeue,
    );
    let outcome = match tokio::time::timeout(ctx.reconcile_timeout, pass).await {
        Ok(result) => result?,
        Err(_) => {
            return Err(errors::Error::ErrorWithRequeue(errors::ErrorWithRequeue::new(
                errors::StdError::Timeout(ctx.reconcile_timeout),
                ctx.conflict_requeue,
            )))
        }
    };

    {
        let mut diagnostics = ctx.diagnostics.write().await;
        diagnostics.last_outcome = Some(format!("{}/{}: {}", ns, name, outcome.as_str()));
        diagnostics.last_error = None;
    }

    if let Some(reason) = event_reason(outcome) {
        ctx.metrics.deployment_write(outcome.as_str());
        let event = Event {
            type_: EventType::Normal,
            reason: reason.into(),
            note: Some(format!("{} Deployment `{}`", reason, name)),
            action: "Reconciling".into(),
            secondary: None,
        };
        if let Err(e) = ctx.cluster.publish_event(&nginx_operator, event).await {
            warn!("failed to publish event for NginxOperator \"{}\": {}", name, e);
        }
    }

    Ok(Action::await_change())
}

fn event_reason(outcome: ReconcileOutcome) -> Option<&'static str> {
    match outcome {
        ReconcileOutcome::Created => Some("Created"),
        ReconcileOutcome::Updated => Some("Updated"),
        ReconcileOutcome::ResourceGone => None,
    }
}

pub fn error_policy(nginx_operator: Arc<NginxOperator>, error: &errors::Error, ctx: Arc<Context>) -> Action {
    warn!("reconcile failed: {:?}", error);
    ctx.metrics.reconcile_failure(&nginx_operator, error);
    if let Ok(mut diagnostics) = ctx.diagnostics.try_write() {
        diagnostics.last_error = Some(format!("{}: {}", nginx_operator.name_any(), error));
    }
    match error {
        errors::Error::ErrorWithRequeue(e) => Action::requeue(e.duration),
        errors::Error::StdError(_) => Action::requeue(ctx.error_requeue),
    }
}

/// Initialize the controller and shared state (given the crd is installed)
pub async fn run(state: State, config: Config) -> anyhow::Result<()> {
    let client = Client::try_default().await?;
    let template = DeploymentTemplate::load(&config.template)?;

    let nginx_operators: Api<NginxOperator> = match &config.watch_namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    };
    let deployments: Api<Deployment> = match &config.watch_namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    };

    if let Err(e) = nginx_operators.list(&ListParams::default().limit(1)).await {
        error!("CRD is not queryable; {e:?}. Is the CRD installed?");
        info!("Installation: cargo run --bin crdgen | kubectl apply -f -");
        return Err(anyhow::anyhow!("NginxOperator CRD is not queryable: {e}"));
    }

    let ctx = state.to_context(Arc::new(KubeClusterClient::new(client)), template, &config)?;

    info!(
        "Watching NginxOperators in {}",
        config.watch_namespace.as_deref().unwrap_or("all namespaces")
    );

    Controller::new(nginx_operators, watcher::Config::default().any_semantic())
        .owns(deployments, watcher::Config::default())
        .with_config(controller::Config::default().concurrency(config.max_concurrent_reconciles))
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok((obj, _)) => debug!("reconciled {}", obj),
                Err(e) => debug!("reconcile error: {}", e),
            }
        })
        .await;

    Ok(())
}
