// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Register catalogs are data, not code: two constant tables sharing one
//! conversion implementation via [`common::RegisterCatalog`].

pub mod common;
pub mod optima251;
pub mod optima270;

use crate::cfg::enums::ControllerModel;
use common::RegisterCatalog;
use optima251::Optima251Catalog;
use optima270::Optima270Catalog;

/// Returns the catalog for `model` as a trait object, for callers that pick
/// the catalog at runtime from configuration.
pub fn catalog_for(model: ControllerModel) -> Box<dyn RegisterCatalog> {
    match model {
        ControllerModel::Optima270 => Box::new(Optima270Catalog),
        ControllerModel::Optima251 => Box::new(Optima251Catalog),
    }
}
