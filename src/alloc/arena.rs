use bytes::{Bytes, BytesMut};

/// Tick-scoped scratch region.
///
/// `push` copies a buffer in and hands back a refcounted slice of the
/// region's current block, so consumers that hold on to the slice keep it
/// alive past the tick without a second copy. `reset` runs once per update
/// and replaces the block when too little of it is left to be useful.
pub(crate) struct Arena {
    buf: BytesMut,
    block_size: usize,
}

impl Arena {
    pub(crate) fn with_block_size(block_size: usize) -> Self {
        Arena {
            buf: BytesMut::with_capacity(block_size),
            block_size,
        }
    }

    pub(crate) fn push(&mut self, data: &[u8]) -> Bytes {
        self.buf.extend_from_slice(data);
        self.buf.split().freeze()
    }

    pub(crate) fn reset(&mut self) {
        debug_assert!(self.buf.is_empty());
        if self.buf.capacity() < self.block_size / 4 {
            self.buf = BytesMut::with_capacity(self.block_size);
        }
    }
}
