//! Plain-text presentation of snapshots and aggregates.

pub(crate) mod render;
pub(crate) mod util;
