// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use bytes::{Bytes, BytesMut};

/// Width of the operation index at the front of payload metadata.
pub const INDEX_LEN: usize = 4;

/// A mesh message: encoded data plus metadata.
///
/// The first four bytes of the metadata address the operation as a
/// big-endian `u32` index into the receiving instance's operation table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payload {
    data: Bytes,
    metadata: Bytes,
}

impl Payload {
    pub fn new(data: impl Into<Bytes>, metadata: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            metadata: metadata.into(),
        }
    }

    /// A payload addressed to operation `index`.
    pub fn for_index(index: u32, data: impl Into<Bytes>) -> Self {
        Self::new(data, Bytes::copy_from_slice(&index.to_be_bytes()))
    }

    /// A payload with no data and no metadata.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn metadata(&self) -> &Bytes {
        &self.metadata
    }

    /// The operation index, if the metadata is long enough to carry one.
    pub fn index(&self) -> Option<u32> {
        let prefix: [u8; INDEX_LEN] = self.metadata.get(..INDEX_LEN)?.try_into().ok()?;
        Some(u32::from_be_bytes(prefix))
    }

    /// Overwrites the operation index, padding short metadata to four bytes.
    /// Metadata past the index is preserved.
    pub fn set_index(&mut self, index: u32) {
        let mut metadata = BytesMut::from(&self.metadata[..]);
        if metadata.len() < INDEX_LEN {
            metadata.resize(INDEX_LEN, 0);
        }
        metadata[..INDEX_LEN].copy_from_slice(&index.to_be_bytes());
        self.metadata = metadata.freeze();
    }

    pub fn into_data(self) -> Bytes {
        self.data
    }
}
