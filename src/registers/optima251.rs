// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use crate::registers::common::{DatapointDescriptor, RegisterCatalog, SetpointDescriptor};

/// Register catalog for the Optima 251 controller: read and write addresses
/// coincide per setpoint, fan stage range 0-4, filter reset is write-only.
pub struct Optima251Catalog;

pub const DATAPOINTS: &[DatapointDescriptor] = &[
    DatapointDescriptor { name: "TEMP_SUPPLY", address: 210, divider: 10, offset: -300, unit: "°C" },
    DatapointDescriptor { name: "TEMP_OUTSIDE", address: 200, divider: 10, offset: -300, unit: "°C" },
    DatapointDescriptor { name: "TEMP_EXHAUST", address: 214, divider: 10, offset: -300, unit: "°C" },
    DatapointDescriptor { name: "TEMP_EXTRACT", address: 224, divider: 10, offset: -300, unit: "°C" },
    DatapointDescriptor { name: "HUMIDITY_EXTRACT", address: 230, divider: 10, offset: 0, unit: "%" },
    DatapointDescriptor { name: "BYPASS_STATE", address: 233, divider: 1, offset: 0, unit: "" },
];

pub const SETPOINTS: &[SetpointDescriptor] = &[
    SetpointDescriptor {
        name: "FAN_SPEED",
        read_address: 7,
        write_address: 7,
        divider: 1,
        offset: 0,
        unit: "stage",
        min: 0,
        max: 4,
        write_only: false,
    },
    SetpointDescriptor {
        name: "TEMP_SETPOINT",
        read_address: 1,
        write_address: 1,
        divider: 10,
        offset: 100,
        unit: "°C",
        min: 0,
        max: 200,
        write_only: false,
    },
    SetpointDescriptor {
        name: "FILTER_RESET",
        read_address: 50,
        write_address: 50,
        divider: 1,
        offset: 0,
        unit: "",
        min: 0,
        max: 1,
        write_only: true,
    },
];

impl RegisterCatalog for Optima251Catalog {
    fn datapoints(&self) -> &'static [DatapointDescriptor] {
        DATAPOINTS
    }

    fn setpoints(&self) -> &'static [SetpointDescriptor] {
        SETPOINTS
    }
}
