//! Time-bucketed cache storage.
//!
//! Entries live in a ring of expiring sets ("levels"). Every access first
//! rotates the ring by however many bucket widths have elapsed, dropping
//! the oldest bucket's keys wholesale. Expiry is therefore amortized O(1)
//! per access instead of a scan over all entries, and no background timer
//! is needed.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

const BASE_LEVELS: usize = 9;
const EXTRA_LEVEL_WIDTH: Duration = Duration::from_millis(500);
const EXTRA_LEVEL_THRESHOLD: Duration = Duration::from_millis(8000);

struct Inner<T> {
    data: HashMap<PathBuf, T>,
    /// Front bucket is the newest; the back bucket expires next.
    levels: VecDeque<HashSet<PathBuf>>,
    last_rotate: Instant,
}

/// Expiring path-keyed cache for one read operation family.
///
/// A zero duration disables caching entirely; every lookup misses.
pub struct Storage<T> {
    duration: Duration,
    width: Duration,
    inner: Mutex<Inner<T>>,
}

impl<T: Clone> Storage<T> {
    pub fn new(duration: Duration) -> Self {
        let mut level_count = BASE_LEVELS;
        if duration > EXTRA_LEVEL_THRESHOLD {
            let extra = (duration - EXTRA_LEVEL_THRESHOLD).as_millis()
                / EXTRA_LEVEL_WIDTH.as_millis();
            level_count += extra as usize;
        }
        let width = if duration.is_zero() {
            Duration::ZERO
        } else {
            duration / level_count as u32
        };
        Self {
            duration,
            width,
            inner: Mutex::new(Inner {
                data: HashMap::new(),
                levels: (0..level_count).map(|_| HashSet::new()).collect(),
                last_rotate: Instant::now(),
            }),
        }
    }

    pub fn get(&self, path: &Path) -> Option<T> {
        if self.duration.is_zero() {
            return None;
        }
        let mut inner = self.inner.lock();
        self.rotate(&mut inner);
        inner.data.get(path).cloned()
    }

    pub fn insert(&self, path: &Path, value: T) {
        if self.duration.is_zero() {
            return;
        }
        let mut inner = self.inner.lock();
        self.rotate(&mut inner);
        let key = path.to_path_buf();
        inner.data.insert(key.clone(), value);
        // A refreshed key must shed its old bucket membership, or it
        // would still be evicted at the original insert's deadline.
        for level in inner.levels.iter_mut() {
            level.remove(&key);
        }
        if let Some(front) = inner.levels.front_mut() {
            front.insert(key);
        }
    }

    /// Drop every entry whose key starts with `prefix` (a purged directory
    /// takes its cached children with it).
    pub fn purge(&self, prefix: &Path) {
        let mut inner = self.inner.lock();
        inner.data.retain(|p, _| !p.starts_with(prefix));
    }

    pub fn purge_all(&self) {
        let mut inner = self.inner.lock();
        inner.data.clear();
        for level in inner.levels.iter_mut() {
            level.clear();
        }
    }

    fn rotate(&self, inner: &mut Inner<T>) {
        let elapsed = inner.last_rotate.elapsed();
        if elapsed < self.width {
            return;
        }
        let ticks = (elapsed.as_nanos() / self.width.as_nanos()) as usize;
        inner.last_rotate += self.width * ticks as u32;

        if ticks >= inner.levels.len() {
            inner.data.clear();
            for level in inner.levels.iter_mut() {
                level.clear();
            }
            return;
        }
        for _ in 0..ticks {
            if let Some(mut expired) = inner.levels.pop_back() {
                for key in expired.drain() {
                    inner.data.remove(&key);
                }
                inner.levels.push_front(expired);
            }
        }
    }
}
