// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use crate::codec::command::{DatapointReadEntry, SetpointReadEntry};

/// A read-only register: a sensor value exposed by the controller.
#[derive(Debug, Clone, Copy)]
pub struct DatapointDescriptor {
    pub name: &'static str,
    pub address: u32,
    pub divider: i32,
    pub offset: i32,
    pub unit: &'static str,
}

/// A read/write register. `read_address` and `write_address` coincide on
/// some firmware families and differ on others.
#[derive(Debug, Clone, Copy)]
pub struct SetpointDescriptor {
    pub name: &'static str,
    pub read_address: u16,
    pub write_address: u16,
    pub divider: i32,
    pub offset: i32,
    pub unit: &'static str,
    pub min: i32,
    pub max: i32,
    pub write_only: bool,
}

/// `display = (raw + offset) / divider`. `divider = 0` is treated as 1.
pub fn to_display(raw: i32, offset: i32, divider: i32) -> f64 {
    let d = if divider == 0 { 1 } else { divider };
    (raw + offset) as f64 / d as f64
}

/// `raw = round(display * divider) - offset`. `divider = 0` is treated as 1.
pub fn to_raw(display: f64, offset: i32, divider: i32) -> i32 {
    let d = if divider == 0 { 1 } else { divider };
    (display * d as f64).round() as i32 - offset
}

/// Capability set a concrete controller catalog must provide so that one
/// polling engine can drive either controller family.
pub trait RegisterCatalog: Send + Sync {
    fn datapoints(&self) -> &'static [DatapointDescriptor];
    fn setpoints(&self) -> &'static [SetpointDescriptor];

    /// Ordered read-list entries for every datapoint, in catalog order.
    fn datapoint_request_list(&self) -> Vec<DatapointReadEntry> {
        self.datapoints()
            .iter()
            .map(|d| DatapointReadEntry { obj: 0, address: d.address })
            .collect()
    }

    /// Ordered read-list entries for every *readable* setpoint, in catalog
    /// order, skipping write-only entries.
    fn setpoint_request_list(&self) -> Vec<SetpointReadEntry> {
        self.setpoints()
            .iter()
            .filter(|s| !s.write_only)
            .map(|s| SetpointReadEntry { obj: 0, address: s.read_address })
            .collect()
    }

    fn convert_datapoint_value(&self, raw: i16, d: &DatapointDescriptor) -> f64 {
        to_display(raw as i32, d.offset, d.divider)
    }

    fn convert_setpoint_value(&self, raw: u16, s: &SetpointDescriptor) -> f64 {
        to_display(raw as i32, s.offset, s.divider)
    }

    fn to_raw_setpoint_value(&self, display: f64, s: &SetpointDescriptor) -> i32 {
        to_raw(display, s.offset, s.divider)
    }

    fn setpoint_by_name(&self, name: &str) -> Option<&'static SetpointDescriptor> {
        self.setpoints().iter().find(|s| s.name == name)
    }

    fn datapoint_by_name(&self, name: &str) -> Option<&'static DatapointDescriptor> {
        self.datapoints().iter().find(|d| d.name == name)
    }
}

/// Lets a catalog chosen at runtime (e.g. from [`crate::registers::catalog_for`])
/// stand in anywhere a concrete `RegisterCatalog` is expected.
impl RegisterCatalog for Box<dyn RegisterCatalog> {
    fn datapoints(&self) -> &'static [DatapointDescriptor] {
        self.as_ref().datapoints()
    }

    fn setpoints(&self) -> &'static [SetpointDescriptor] {
        self.as_ref().setpoints()
    }
}
