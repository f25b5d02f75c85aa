//! Opaque resume token for remote key scans

/// Position of a remote scan
///
/// A cursor is either at the start, somewhere in the middle of a node's
/// keyspace, or finished. `node` indexes the shard being walked when the
/// store is clustered and is always zero for a single node. The `token` is
/// owned by the store implementation (a SCAN cursor for Redis, the last key
/// returned for the in-process store).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RemoteCursor {
    node: usize,
    token: String,
    finished: bool,
}

impl RemoteCursor {
    /// Cursor positioned before the first key
    pub fn start() -> Self {
        Self::default()
    }

    /// Cursor resuming on `node` from `token`
    pub fn at(node: usize, token: impl Into<String>) -> Self {
        Self {
            node,
            token: token.into(),
            finished: false,
        }
    }

    /// Terminal cursor
    pub fn finished() -> Self {
        Self {
            node: 0,
            token: String::new(),
            finished: true,
        }
    }

    pub fn node(&self) -> usize {
        self.node
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// True when the scan has walked the whole keyspace
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}
