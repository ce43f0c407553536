//! Inventory assembly
//!
//! A run loads groups and devices, then writes them into the store in four
//! strictly ordered phases:
//! 1. register every group under its sanitized name
//! 2. wire parent -> child group edges; orphan parents are skipped
//! 3. register devices as hosts with mapped variables
//! 4. query each group's members and attach them to the group
//!
//! Any fetch failure aborts the run. Edge failures in phase 2 are logged
//! and skipped.

use prime_core::{
    map_attributes, GroupIndex, InventoryStore, RemoteDevice, ResponseCache,
};
use tracing::{info, trace, warn};

use crate::api::PrimeClient;
use crate::error::SyncError;
use crate::transport::Transport;

/// Policy for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Leave out devices whose management status is `UNMANAGED`
    pub exclude_unmanaged: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            exclude_unmanaged: true,
        }
    }
}

/// Counters collected during a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub groups: usize,
    pub edges_linked: usize,
    pub edges_skipped: usize,
    pub hosts: usize,
    pub hosts_excluded: usize,
    pub memberships: usize,
    pub memberships_skipped: usize,
}

/// Populate `store` from Prime
pub fn populate<T, C, S>(
    client: &mut PrimeClient<T, C>,
    store: &mut S,
    options: &SyncOptions,
) -> Result<SyncReport, SyncError>
where
    T: Transport,
    C: ResponseCache,
    S: InventoryStore,
{
    let groups = client.load_groups()?;
    let devices = client.load_devices()?;
    let mut report = SyncReport::default();

    register_groups(&groups, store, &mut report);
    wire_hierarchy(&groups, store, &mut report);
    register_devices(&devices, store, options, &mut report)?;
    assign_memberships(client, &groups, store, &mut report)?;

    info!(
        groups = report.groups,
        edges = report.edges_linked,
        edges_skipped = report.edges_skipped,
        hosts = report.hosts,
        hosts_excluded = report.hosts_excluded,
        memberships = report.memberships,
        "Inventory populated"
    );
    Ok(report)
}

fn register_groups<S: InventoryStore>(groups: &GroupIndex, store: &mut S, report: &mut SyncReport) {
    for group in groups.groups() {
        store.add_group(&group.inventory_name());
        report.groups += 1;
    }
}

fn wire_hierarchy<S: InventoryStore>(groups: &GroupIndex, store: &mut S, report: &mut SyncReport) {
    for edge in groups.edges() {
        let edge = match edge {
            Ok(edge) => edge,
            Err(orphan) => {
                warn!(
                    group = %orphan.child,
                    parent_id = orphan.parent_id,
                    "Skipping group with unknown parent"
                );
                report.edges_skipped += 1;
                continue;
            }
        };

        trace!(parent = %edge.parent, child = %edge.child, "Adding group edge");
        match store.add_child(&edge.parent, &edge.child) {
            Ok(()) => report.edges_linked += 1,
            Err(e) => {
                warn!(parent = %edge.parent, child = %edge.child, error = %e, "Skipping group edge");
                report.edges_skipped += 1;
            }
        }
    }
}

fn register_devices<S: InventoryStore>(
    devices: &[RemoteDevice],
    store: &mut S,
    options: &SyncOptions,
    report: &mut SyncReport,
) -> Result<(), SyncError> {
    for device in devices {
        if options.exclude_unmanaged && device.is_unmanaged() {
            trace!(host = %device.name, "Excluding unmanaged device");
            report.hosts_excluded += 1;
            continue;
        }

        trace!(host = %device.name, "Adding host");
        store.add_host(&device.name, None)?;
        for (name, value) in map_attributes(device) {
            store.set_variable(&device.name, &name, value)?;
        }
        report.hosts += 1;
    }
    Ok(())
}

fn assign_memberships<T, C, S>(
    client: &mut PrimeClient<T, C>,
    groups: &GroupIndex,
    store: &mut S,
    report: &mut SyncReport,
) -> Result<(), SyncError>
where
    T: Transport,
    C: ResponseCache,
    S: InventoryStore,
{
    for group in groups.groups() {
        let group_name = group.inventory_name();
        trace!(group = %group.path, "Processing group members");

        for device in client.devices_in_group(&group.path)? {
            if !store.has_host(&device.name) {
                trace!(group = %group_name, host = %device.name, "Skipping member that is not in the inventory");
                report.memberships_skipped += 1;
                continue;
            }
            trace!(group = %group_name, host = %device.name, "Adding member");
            store.add_child(&group_name, &device.name)?;
            report.memberships += 1;
        }
    }
    Ok(())
}
