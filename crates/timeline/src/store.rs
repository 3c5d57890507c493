//! Injected state access. The engine never reaches for a global; whoever owns
//! the application state hands it a [`Store`].

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

pub trait Store<T: Clone> {
    fn get(&self) -> T;
    /// Bumped on every change; cheap to compare for render-on-change.
    fn revision(&self) -> u64;
    fn subscribe(&self, listener: Listener<T>) -> SubscriptionId;
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}

pub struct MemoryStore<T> {
    state: RwLock<(T, u64)>,
    listeners: Mutex<Vec<(SubscriptionId, Listener<T>)>>,
    next_id: Mutex<u64>,
}

impl<T: Clone + Send + Sync> MemoryStore<T> {
    pub fn new(initial: T) -> Self {
        Self { state: RwLock::new((initial, 0)), listeners: Mutex::new(Vec::new()), next_id: Mutex::new(0) }
    }

    pub fn set(&self, value: T) {
        self.update(|state| *state = value);
    }

    /// Applies `f` under the write lock, then notifies listeners outside it.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let (result, snapshot) = {
            let mut guard = self.state.write();
            let result = f(&mut guard.0);
            guard.1 += 1;
            (result, guard.0.clone())
        };
        let listeners: Vec<Listener<T>> = self.listeners.lock().iter().map(|(_, l)| l.clone()).collect();
        for listener in listeners {
            listener(&snapshot);
        }
        result
    }

    /// Borrowing read without cloning the whole state.
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.state.read().0)
    }
}

impl<T: Clone + Send + Sync> Store<T> for MemoryStore<T> {
    fn get(&self) -> T {
        self.state.read().0.clone()
    }

    fn revision(&self) -> u64 {
        self.state.read().1
    }

    fn subscribe(&self, listener: Listener<T>) -> SubscriptionId {
        let id = {
            let mut next = self.next_id.lock();
            *next += 1;
            SubscriptionId(*next)
        };
        self.listeners.lock().push((id, listener));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(sid, _)| *sid != id);
        listeners.len() != before
    }
}
