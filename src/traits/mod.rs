// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod action;
pub mod codec;
pub mod instance;

pub use action::{Action, StepOutcome};
pub use codec::Codec;
pub use instance::Instance;
