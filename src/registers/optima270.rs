// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use crate::registers::common::{DatapointDescriptor, RegisterCatalog, SetpointDescriptor};

/// Register catalog for the Optima 270 controller family: separate read and
/// write addresses per setpoint, fan stage range 1-4.
pub struct Optima270Catalog;

/// Address 18 is claimed by both `SACRIFICIAL_ANODE` and `DUTYCYCLE_SUPPLY`
/// on this firmware family; both are surfaced deliberately rather than
/// picking one. Their raw values are identical when the firmware reuses the
/// slot.
pub const DATAPOINTS: &[DatapointDescriptor] = &[
    DatapointDescriptor { name: "TEMP_SUPPLY", address: 210, divider: 10, offset: -300, unit: "°C" },
    DatapointDescriptor { name: "TEMP_OUTSIDE", address: 200, divider: 10, offset: -300, unit: "°C" },
    DatapointDescriptor { name: "TEMP_EXHAUST", address: 214, divider: 10, offset: -300, unit: "°C" },
    DatapointDescriptor { name: "TEMP_EXTRACT", address: 224, divider: 10, offset: -300, unit: "°C" },
    DatapointDescriptor { name: "HUMIDITY_EXTRACT", address: 230, divider: 10, offset: 0, unit: "%" },
    DatapointDescriptor { name: "FAN_SPEED_SUPPLY_RPM", address: 231, divider: 1, offset: 0, unit: "rpm" },
    DatapointDescriptor { name: "FAN_SPEED_EXHAUST_RPM", address: 232, divider: 1, offset: 0, unit: "rpm" },
    DatapointDescriptor { name: "BYPASS_STATE", address: 233, divider: 1, offset: 0, unit: "" },
    DatapointDescriptor { name: "SACRIFICIAL_ANODE", address: 18, divider: 1, offset: 0, unit: "h" },
    DatapointDescriptor { name: "DUTYCYCLE_SUPPLY", address: 18, divider: 1, offset: 0, unit: "%" },
    DatapointDescriptor { name: "FILTER_RUNTIME_HOURS", address: 240, divider: 1, offset: 0, unit: "h" },
    DatapointDescriptor { name: "ALARM_CODE", address: 241, divider: 1, offset: 0, unit: "" },
];

pub const SETPOINTS: &[SetpointDescriptor] = &[
    SetpointDescriptor {
        name: "FAN_SPEED",
        read_address: 7,
        write_address: 24,
        divider: 1,
        offset: 0,
        unit: "stage",
        min: 1,
        max: 4,
        write_only: false,
    },
    SetpointDescriptor {
        name: "TEMP_SETPOINT",
        read_address: 1,
        write_address: 12,
        divider: 10,
        offset: 100,
        unit: "°C",
        min: 0,
        max: 200,
        write_only: false,
    },
    SetpointDescriptor {
        name: "REHEAT_ENABLE",
        read_address: 3,
        write_address: 14,
        divider: 1,
        offset: 0,
        unit: "",
        min: 0,
        max: 1,
        write_only: false,
    },
];

impl RegisterCatalog for Optima270Catalog {
    fn datapoints(&self) -> &'static [DatapointDescriptor] {
        DATAPOINTS
    }

    fn setpoints(&self) -> &'static [SetpointDescriptor] {
        SETPOINTS
    }
}
