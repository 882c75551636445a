// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use genvex_tunnel_client::registers::common::{to_display, to_raw};
use genvex_tunnel_client::registers::optima270::Optima270Catalog;
use genvex_tunnel_client::registers::common::RegisterCatalog;

#[test]
fn test_display_to_raw_round_trip_for_integer_displays() {
    let (divider, offset) = (10, 100);
    for v in -50..=50 {
        let display = v as f64;
        let raw = to_raw(display, offset, divider);
        assert_eq!(to_display(raw, offset, divider), display);
    }
}

#[test]
fn test_raw_to_display_round_trip_when_exactly_representable() {
    let (divider, offset) = (10, -300);
    for raw in (-32768..=32767).step_by(977) {
        let display = to_display(raw, offset, divider);
        if (display * divider as f64).fract() == 0.0 {
            assert_eq!(to_raw(display, offset, divider), raw);
        }
    }
}

#[test]
fn test_temperature_setpoint_scenario() {
    let catalog = Optima270Catalog;
    let setpoint = catalog.setpoint_by_name("TEMP_SETPOINT").expect("present");
    assert_eq!(catalog.to_raw_setpoint_value(22.0, setpoint), 120);
}
