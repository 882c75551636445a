// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use core::fmt;

use serde::{Deserialize, Serialize};

/// Which controller family's register catalog to load.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerModel {
    #[serde(rename = "Optima270", alias = "optima270", alias = "optima_270")]
    Optima270,
    #[serde(rename = "Optima251", alias = "optima251", alias = "optima_251")]
    Optima251,
}

impl fmt::Display for ControllerModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ControllerModel::Optima270 => "Optima270",
            ControllerModel::Optima251 => "Optima251",
        })
    }
}
