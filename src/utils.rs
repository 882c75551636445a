// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use rand::Rng;

/// Generates a random 32-bit client nonce for a new session.
///
/// Zero is reserved to mean "unassigned" (the initial value of `serverId`),
/// so it is excluded from the generated range.
pub fn generate_client_id() -> u32 {
    loop {
        let id: u32 = rand::rng().random();
        if id != 0 {
            return id;
        }
    }
}
