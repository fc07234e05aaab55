//! Work queue of coordinates shared by the workers.

use orbit_core::{Coordinate, Galaxy, SystemRange};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

/// FIFO of coordinates still to scan.
///
/// Each coordinate is handed out once; nothing is put back.
#[derive(Debug, Default)]
pub struct CoordinateQueue {
    items: Mutex<VecDeque<Coordinate>>,
    seeded: AtomicUsize,
}

impl CoordinateQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue every system of `systems` in `galaxy`, in ascending order.
    pub fn seed(&self, galaxy: Galaxy, systems: &SystemRange) -> usize {
        self.seed_coordinates(systems.iter().map(|system| Coordinate::new(galaxy, system)))
    }

    /// Enqueue arbitrary coordinates.
    pub fn seed_coordinates(&self, coordinates: impl IntoIterator<Item = Coordinate>) -> usize {
        let mut items = self.items.lock();
        let before = items.len();
        items.extend(coordinates);
        let added = items.len() - before;
        self.seeded.fetch_add(added, Ordering::Relaxed);
        added
    }

    /// Take the next coordinate, if any.
    pub fn pop(&self) -> Option<Coordinate> {
        self.items.lock().pop_front()
    }

    /// Coordinates not yet handed out.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.items.lock().len()
    }

    /// Coordinates ever enqueued.
    #[must_use]
    pub fn total(&self) -> usize {
        self.seeded.load(Ordering::Relaxed)
    }
}
