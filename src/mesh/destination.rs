// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use arc_swap::ArcSwap;
use std::fmt;
use std::sync::Arc;

use crate::compute::{Flux, Mono, Payload};
use crate::engine::Context;
use crate::traits::Instance;

/// Where an export currently lives: the instance and the index it exports
/// the operation at.
pub struct Destination {
    pub instance: Arc<dyn Instance>,
    pub index: u32,
}

/// The swappable pointer for one `(namespace, operation)` export. Dispatch
/// and forwarding handlers load it per call, so a re-export retargets them.
pub(crate) type Slot = Arc<ArcSwap<Destination>>;

impl Destination {
    pub fn new(instance: Arc<dyn Instance>, index: u32) -> Self {
        Self { instance, index }
    }

    pub fn request_response(&self, ctx: Context, mut payload: Payload) -> Mono {
        payload.set_index(self.index);
        self.instance.request_response(ctx, payload)
    }

    pub fn fire_and_forget(&self, ctx: Context, mut payload: Payload) {
        payload.set_index(self.index);
        self.instance.fire_and_forget(ctx, payload)
    }

    pub fn request_stream(&self, ctx: Context, mut payload: Payload) -> Flux {
        payload.set_index(self.index);
        self.instance.request_stream(ctx, payload)
    }

    pub fn request_channel(&self, ctx: Context, mut payload: Payload, inbound: Flux) -> Flux {
        payload.set_index(self.index);
        self.instance.request_channel(ctx, payload, inbound)
    }
}

impl fmt::Debug for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Destination")
            .field("instance", &self.instance.name())
            .field("index", &self.index)
            .finish()
    }
}
