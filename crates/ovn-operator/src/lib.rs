//! OVN agent operator
//!
//! Runs the OVN controller and Open vSwitch agents on every selected node of
//! a Kubernetes cluster, and configures each controller agent against the
//! southbound database once it is running.

#![warn(missing_docs)]

/// Reconcilers for OVNController, OVSDBServer and OVSvswitchd
pub mod controller;
/// Controller futures driving the reconcilers
pub mod controller_runner;
/// Agent CRD installation and rendering
pub mod crds;
