pub(crate) mod arena;
pub(crate) mod pool;
pub(crate) mod queue;
