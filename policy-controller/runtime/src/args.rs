use crate::{admission::Admission, k8s, lease, status};
use anyhow::{bail, Result};
use clap::Parser;
use gateway_policy_controller_k8s_api::gateway;
use kube::runtime::watcher;
use prometheus_client::registry::Registry;
use tokio::{sync::mpsc, time::Duration};
use tracing::{info_span, Instrument};

const RECONCILIATION_PERIOD: Duration = Duration::from_secs(10);

// The maximum number of status patches to buffer. As a conservative
// estimate, we assume that sending a patch will take at least 1ms, so we set
// the buffer size to be the same as the reconciliation period in
// milliseconds.
const STATUS_UPDATE_QUEUE_SIZE: usize = RECONCILIATION_PERIOD.as_millis() as usize;

#[derive(Debug, Parser)]
#[clap(name = "policy", about = "A gateway policy attachment controller")]
pub struct Args {
    #[clap(
        long,
        default_value = "gateway_policy_controller=info,warn",
        env = "GATEWAY_POLICY_CONTROLLER_LOG"
    )]
    log_level: kubert::LogFilter,

    #[clap(long, default_value = "plain")]
    log_format: kubert::LogFormat,

    #[clap(flatten)]
    client: kubert::ClientArgs,

    #[clap(flatten)]
    server: kubert::ServerArgs,

    #[clap(flatten)]
    admin: kubert::AdminArgs,

    /// Disables the admission controller server.
    #[clap(long)]
    admission_controller_disabled: bool,

    #[clap(long, default_value = "gateway-policy-controller")]
    policy_deployment_name: String,

    #[clap(long, default_value = "gateway-mesh")]
    control_plane_namespace: String,

    #[clap(long, default_value = "5000")]
    patch_timeout_ms: u64,
}

impl Args {
    #[inline]
    pub async fn parse_and_run() -> Result<()> {
        Self::parse().run().await
    }

    pub async fn run(self) -> Result<()> {
        let Self {
            admin,
            client,
            log_level,
            log_format,
            server,
            admission_controller_disabled,
            policy_deployment_name,
            control_plane_namespace,
            patch_timeout_ms,
        } = self;

        let server = if admission_controller_disabled {
            None
        } else {
            Some(server)
        };

        let mut prom = <Registry>::default();
        let resource_status = prom.sub_registry_with_prefix("resource_status");
        let status_metrics = status::ControllerMetrics::register(resource_status);
        let status_index_metrics = status::IndexMetrics::register(resource_status);
        let rt_metrics = kubert::RuntimeMetrics::register(prom.sub_registry_with_prefix("kube"));

        let mut runtime = kubert::Runtime::builder()
            .with_log(log_level, log_format)
            .with_metrics(rt_metrics)
            .with_admin(admin.into_builder().with_prometheus(prom))
            .with_client(client)
            .with_optional_server(server)
            .build()
            .await?;

        let hostname =
            std::env::var("HOSTNAME").expect("Failed to fetch `HOSTNAME` environment variable");

        let claims = lease::init(
            &runtime,
            &control_plane_namespace,
            &policy_deployment_name,
            &hostname,
        )
        .await?;

        // Build the status index which maintains the information necessary
        // for updating the status field of policy resources.
        let (updates_tx, updates_rx) = mpsc::channel(STATUS_UPDATE_QUEUE_SIZE);
        let status_index = status::Index::shared(
            hostname.clone(),
            claims.clone(),
            updates_tx,
            status_index_metrics,
        );

        // Spawn resource watches.

        macro_rules! watch_resource {
            ($resource:ty, $span:expr) => {
                let watch = runtime.watch_all::<$resource>(watcher::Config::default());
                tokio::spawn(
                    kubert::index::namespaced(status_index.clone(), watch)
                        .instrument(info_span!($span)),
                );
            };
        }

        watch_resource!(k8s::policy::AccessControlPolicy, "accesscontrolpolicies");
        watch_resource!(k8s::policy::RateLimitPolicy, "ratelimitpolicies");
        watch_resource!(k8s::policy::FaultInjectionPolicy, "faultinjectionpolicies");
        watch_resource!(k8s::policy::HealthCheckPolicy, "healthcheckpolicies");
        watch_resource!(k8s::policy::LoadBalancerPolicy, "loadbalancerpolicies");
        watch_resource!(k8s::policy::CircuitBreakingPolicy, "circuitbreakingpolicies");
        watch_resource!(k8s::policy::SessionStickyPolicy, "sessionstickypolicies");
        watch_resource!(k8s::policy::RetryPolicy, "retrypolicies");
        watch_resource!(k8s::policy::UpstreamTLSPolicy, "upstreamtlspolicies");
        watch_resource!(k8s::policy::GatewayTLSPolicy, "gatewaytlspolicies");

        watch_resource!(k8s::Service, "services");
        watch_resource!(k8s::Secret, "secrets");

        if api_resource_exists::<gateway::Gateway>(&runtime.client()).await {
            watch_resource!(gateway::Gateway, "gateways.gateway.networking.k8s.io");
        } else {
            tracing::warn!("gateways.gateway.networking.k8s.io resource kind not found, skipping watches");
        }

        if api_resource_exists::<gateway::HTTPRoute>(&runtime.client()).await {
            watch_resource!(gateway::HTTPRoute, "httproutes.gateway.networking.k8s.io");
        } else {
            tracing::warn!("httproutes.gateway.networking.k8s.io resource kind not found, skipping watches");
        }

        if api_resource_exists::<gateway::GRPCRoute>(&runtime.client()).await {
            watch_resource!(gateway::GRPCRoute, "grpcroutes.gateway.networking.k8s.io");
        } else {
            tracing::warn!("grpcroutes.gateway.networking.k8s.io resource kind not found, skipping watches");
        }

        if api_resource_exists::<gateway::ReferenceGrant>(&runtime.client()).await {
            watch_resource!(
                gateway::ReferenceGrant,
                "referencegrants.gateway.networking.k8s.io"
            );
        } else {
            tracing::warn!("referencegrants.gateway.networking.k8s.io resource kind not found, skipping watches");
        }

        if api_resource_exists::<k8s::multicluster::ServiceImport>(&runtime.client()).await {
            watch_resource!(k8s::multicluster::ServiceImport, "serviceimports");
        } else {
            tracing::warn!("serviceimports resource kind not found, skipping watches");
        }

        // Periodic reconciliation repairs statuses overwritten out-of-band.
        tokio::spawn(
            status::Index::run(status_index.clone(), RECONCILIATION_PERIOD)
                .instrument(info_span!("status_index")),
        );

        let client = runtime.client();
        let status_controller = status::Controller::new(
            claims,
            client.clone(),
            hostname,
            updates_rx,
            Duration::from_millis(patch_timeout_ms),
            status_metrics,
        );
        tokio::spawn(
            status_controller
                .run()
                .instrument(info_span!("status_controller")),
        );

        let runtime = runtime.spawn_server(move || Admission::new(client));

        // Block the main thread on the shutdown signal. Once it fires, wait
        // for the background tasks to complete before exiting.
        if runtime.run().await.is_err() {
            bail!("Aborted");
        }

        Ok(())
    }
}

async fn api_resource_exists<T>(client: &kube::Client) -> bool
where
    T: kube::Resource,
    T::DynamicType: Default,
{
    let dt = Default::default();
    client
        .list_api_group_resources(&format!("{}/{}", T::group(&dt), T::version(&dt)))
        .await
        .map(|list| list.resources.iter().any(|res| res.kind == T::kind(&dt)))
        .unwrap_or(false)
}
