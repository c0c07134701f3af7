//! Debug/production command selection for the agent containers

use ovn_common::crd::AgentKind;

use crate::k8s::{ExecAction, ProbeSpec};

const PROBE_TIMEOUT_SECONDS: i32 = 5;
const PROBE_PERIOD_SECONDS: i32 = 3;
const PROBE_INITIAL_DELAY_SECONDS: i32 = 3;

/// How an agent container runs
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Container idles so an operator can exec in without the daemon running
    Debug,
    /// Container runs the agent
    Production,
}

/// Command, health check and shutdown hook selected for one container
#[derive(Clone, Debug, PartialEq)]
pub struct ContainerCommands {
    /// Entry point
    pub command: Vec<String>,
    /// Entry point arguments
    pub args: Vec<String>,
    /// Liveness probe, if the agent exposes one
    pub liveness_probe: Option<ProbeSpec>,
    /// Pre-stop exec command
    pub pre_stop: Vec<String>,
}

impl Mode {
    /// Select the mode from the resource's debug flag
    pub fn from_debug(debug: bool) -> Self {
        if debug {
            Self::Debug
        } else {
            Self::Production
        }
    }

    /// Commands for an agent of `kind` in this mode
    pub fn commands(self, kind: AgentKind) -> ContainerCommands {
        match self {
            Self::Debug => ContainerCommands {
                command: strings(&["/bin/sleep"]),
                args: strings(&["infinity"]),
                liveness_probe: kind
                    .has_liveness_probe()
                    .then(|| exec_probe(&["/bin/true"])),
                pre_stop: strings(&["/bin/true"]),
            },
            Self::Production => production(kind),
        }
    }
}

fn production(kind: AgentKind) -> ContainerCommands {
    // The trailing sleep keeps the network namespace alive until the agent
    // has finished its graceful stop during a rolling restart.
    match kind {
        AgentKind::Controller => ContainerCommands {
            command: strings(&["/bin/bash", "-c"]),
            args: strings(&[
                "/usr/local/bin/container-scripts/net_setup.sh && ovn-controller --pidfile unix:/run/openvswitch/db.sock",
            ]),
            liveness_probe: None,
            pre_stop: graceful_stop(&["/usr/share/ovn/scripts/ovn-ctl", "stop_controller"]),
        },
        AgentKind::DbServer => ContainerCommands {
            command: strings(&["/usr/bin/dumb-init"]),
            args: strings(&[
                "--single-child",
                "--",
                "/usr/local/bin/container-scripts/start-ovsdb-server.sh",
            ]),
            liveness_probe: Some(exec_probe(&["/usr/bin/ovs-vsctl", "show"])),
            pre_stop: graceful_stop(&[
                "/usr/share/openvswitch/scripts/ovs-ctl",
                "stop",
                "--no-ovs-vswitchd",
            ]),
        },
        AgentKind::Vswitchd => ContainerCommands {
            command: strings(&["/usr/sbin/ovs-vswitchd"]),
            args: strings(&["--pidfile", "--mlockall"]),
            liveness_probe: Some(exec_probe(&["/usr/bin/ovs-appctl", "bond/show"])),
            pre_stop: graceful_stop(&[
                "/usr/share/openvswitch/scripts/ovs-ctl",
                "stop",
                "--no-ovsdb-server",
            ]),
        },
    }
}

fn graceful_stop(stop: &[&str]) -> Vec<String> {
    let mut cmd = strings(stop);
    cmd.extend(strings(&[";", "sleep", "2"]));
    cmd
}

fn exec_probe(command: &[&str]) -> ProbeSpec {
    ProbeSpec {
        exec: Some(ExecAction {
            command: strings(command),
        }),
        initial_delay_seconds: Some(PROBE_INITIAL_DELAY_SECONDS),
        period_seconds: Some(PROBE_PERIOD_SECONDS),
        timeout_seconds: Some(PROBE_TIMEOUT_SECONDS),
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
