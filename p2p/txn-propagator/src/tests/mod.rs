
use std::{
    cmp::Ordering,
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    thread,
    time::{Duration, Instant},
};

use crate::{
    traits::{BoxError, ConnectionManager, PeerInventory, PoolView, TxPool},
    SendingDescriptor,
};

pub(crate) type TestDescriptor = SendingDescriptor<u64, Vec<u8>>;

pub(crate) fn descriptor(id: u64) -> TestDescriptor {
    SendingDescriptor::new(id, Arc::new(id.to_le_bytes().to_vec()))
}

/// Polls `cond` until it returns `true` or `timeout` passes.
pub(crate) fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }

    cond()
}

/// An in-memory pool, ordering transactions by the position they were added at.
///
/// Transactions not in the pool are ordered after all others.
#[derive(Default)]
pub(crate) struct MockPool {
    positions: Mutex<HashMap<u64, u64>>,
    panic_on_compare: AtomicBool,
    /// Reverse the order on every other [`TxPool::lock`], as if the pool was reorganised in between.
    flip_each_lock: AtomicBool,
    locks: AtomicU64,
}

impl MockPool {
    pub(crate) fn with_txs(ids: &[u64]) -> Arc<Self> {
        let pool = Self::default();
        {
            let mut positions = pool.positions.lock().unwrap();
            for (pos, id) in ids.iter().enumerate() {
                positions.insert(*id, pos as u64);
            }
        }
        Arc::new(pool)
    }

    pub(crate) fn panic_on_compare(&self) {
        self.panic_on_compare.store(true, AtomicOrdering::SeqCst);
    }

    pub(crate) fn flip_each_lock(&self) {
        self.flip_each_lock.store(true, AtomicOrdering::SeqCst);
    }
}

pub(crate) struct MockPoolGuard<'a> {
    positions: MutexGuard<'a, HashMap<u64, u64>>,
    panic_on_compare: bool,
    reversed: bool,
}

impl PoolView<u64> for MockPoolGuard<'_> {
    fn compare(&self, a: &u64, b: &u64) -> Ordering {
        assert!(!self.panic_on_compare, "pool comparator failure");

        let pos = |id: &u64| self.positions.get(id).copied().unwrap_or(u64::MAX);
        let order = pos(a).cmp(&pos(b));

        if self.reversed {
            order.reverse()
        } else {
            order
        }
    }
}

impl TxPool for MockPool {
    type TxId = u64;
    type Tx = Vec<u8>;
    type Guard<'a>
        = MockPoolGuard<'a>
    where
        Self: 'a;

    fn lock(&self) -> Self::Guard<'_> {
        let count = self.locks.fetch_add(1, AtomicOrdering::SeqCst);

        MockPoolGuard {
            positions: self
                .positions
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
            panic_on_compare: self.panic_on_compare.load(AtomicOrdering::SeqCst),
            reversed: self.flip_each_lock.load(AtomicOrdering::SeqCst) && count % 2 == 1,
        }
    }
}

/// A peer recording every batch it is given.
#[derive(Debug, Default)]
pub(crate) struct MockPeer {
    added: Mutex<Vec<Vec<u64>>>,
    removed: Mutex<Vec<Vec<u64>>>,
    fail: bool,
}

impl MockPeer {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A peer that errors on every request.
    pub(crate) fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Default::default()
        })
    }

    /// Every batch added to this peer.
    pub(crate) fn added(&self) -> Vec<Vec<u64>> {
        self.added.lock().unwrap().clone()
    }

    /// Every batch removed from this peer.
    pub(crate) fn removed(&self) -> Vec<Vec<u64>> {
        self.removed.lock().unwrap().clone()
    }

    /// Every transaction added to this peer, flattened.
    pub(crate) fn added_ids(&self) -> Vec<u64> {
        self.added().into_iter().flatten().collect()
    }
}

fn record(batches: &Mutex<Vec<Vec<u64>>>, txns: &[TestDescriptor]) {
    batches
        .lock()
        .unwrap()
        .push(txns.iter().map(|tx| *tx.tx_id()).collect());
}

impl PeerInventory<u64, Vec<u8>> for MockPeer {
    fn add_pending(&self, txns: &[TestDescriptor]) -> Result<(), BoxError> {
        if self.fail {
            return Err("peer connection closed".into());
        }
        record(&self.added, txns);
        Ok(())
    }

    fn remove_pending(&self, txns: &[TestDescriptor]) -> Result<(), BoxError> {
        if self.fail {
            return Err("peer connection closed".into());
        }
        record(&self.removed, txns);
        Ok(())
    }
}

/// A connection manager with a fixed, but replaceable, set of peers.
#[derive(Default)]
pub(crate) struct MockConnections {
    peers: Mutex<Vec<Arc<MockPeer>>>,
    /// Called on every snapshot, from the thread taking it.
    on_snapshot: Mutex<Option<Box<dyn Fn() + Send>>>,
}

impl MockConnections {
    pub(crate) fn with_peers(peers: &[Arc<MockPeer>]) -> Arc<Self> {
        Arc::new(Self {
            peers: Mutex::new(peers.to_vec()),
            on_snapshot: Mutex::new(None),
        })
    }

    pub(crate) fn set_peers(&self, peers: &[Arc<MockPeer>]) {
        *self.peers.lock().unwrap() = peers.to_vec();
    }

    pub(crate) fn on_snapshot(&self, hook: impl Fn() + Send + 'static) {
        *self.on_snapshot.lock().unwrap() = Some(Box::new(hook));
    }
}

impl ConnectionManager<u64, Vec<u8>> for MockConnections {
    type Peer = Arc<MockPeer>;

    fn connected_peers(&self) -> Vec<Self::Peer> {
        if let Some(hook) = &*self.on_snapshot.lock().unwrap() {
            hook();
        }

        self.peers.lock().unwrap().clone()
    }
}
