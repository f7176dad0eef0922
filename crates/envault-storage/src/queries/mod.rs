// SPDX-FileCopyrightText: 2026 Envault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for CRUD operations on storage entities.

pub mod keys;
pub mod local_state;
pub mod rotation_lock;
pub mod secrets;
