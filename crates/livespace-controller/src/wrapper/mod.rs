// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Wrapper module - activity execution backends.

pub mod mock;
pub mod native;
mod traits;

pub use mock::{MockActivityBehavior, MockActivityWrapperFactory};
pub use native::NativeActivityWrapperFactory;
pub use traits::*;
