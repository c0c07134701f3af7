//! Controller runner - builds one controller future per agent resource
//!
//! Construction is kept free of side effects so the caller decides how the
//! futures are driven.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::StreamExt;
use k8s_openapi::api::apps::v1::DaemonSet;
use k8s_openapi::api::batch::v1::Job;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::Controller;
use kube::{Api, Client};

use ovn_common::crd::{OVNController, OVSDBServer, OVSvswitchd};
use ovn_common::ImageDefaults;

use crate::controller::{
    error_policy, reconcile_controller, reconcile_db_server, reconcile_vswitchd, Context,
};

/// Watcher timeout (seconds) - must be less than client read_timeout (30s)
const WATCH_TIMEOUT_SECS: u32 = 25;

/// Boxed controller future
pub type ControllerFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

fn watcher_config() -> WatcherConfig {
    WatcherConfig::default().timeout(WATCH_TIMEOUT_SECS)
}

/// Build the OVNController, OVSDBServer and OVSvswitchd controllers
///
/// Each controller also watches the DaemonSets it owns, so a drifted or
/// deleted DaemonSet triggers a pass. The OVNController controller watches
/// its configuration Jobs as well.
pub fn build_agent_controllers(client: Client, images: ImageDefaults) -> Vec<ControllerFuture> {
    let ctx = Arc::new(Context::new(client.clone(), images));
    let daemonsets: Api<DaemonSet> = Api::all(client.clone());

    tracing::info!("- OVNController controller");
    let controllers = Controller::new(Api::<OVNController>::all(client.clone()), watcher_config())
        .owns(daemonsets.clone(), watcher_config())
        .owns(Api::<Job>::all(client.clone()), watcher_config())
        .shutdown_on_signal()
        .run(reconcile_controller, error_policy::<OVNController>, ctx.clone())
        .for_each(log_reconcile_result("OVNController"));

    tracing::info!("- OVSDBServer controller");
    let db_servers = Controller::new(Api::<OVSDBServer>::all(client.clone()), watcher_config())
        .owns(daemonsets.clone(), watcher_config())
        .shutdown_on_signal()
        .run(reconcile_db_server, error_policy::<OVSDBServer>, ctx.clone())
        .for_each(log_reconcile_result("OVSDBServer"));

    tracing::info!("- OVSvswitchd controller");
    let vswitchds = Controller::new(Api::<OVSvswitchd>::all(client), watcher_config())
        .owns(daemonsets, watcher_config())
        .shutdown_on_signal()
        .run(reconcile_vswitchd, error_policy::<OVSvswitchd>, ctx)
        .for_each(log_reconcile_result("OVSvswitchd"));

    vec![
        Box::pin(controllers),
        Box::pin(db_servers),
        Box::pin(vswitchds),
    ]
}

fn log_reconcile_result<T: std::fmt::Debug, E: std::fmt::Debug>(
    controller_name: &'static str,
) -> impl Fn(Result<T, E>) -> std::future::Ready<()> {
    move |result| {
        match result {
            Ok(action) => tracing::debug!(?action, "{} reconciliation completed", controller_name),
            Err(e) => tracing::error!(error = ?e, "{} reconciliation error", controller_name),
        }
        std::future::ready(())
    }
}
