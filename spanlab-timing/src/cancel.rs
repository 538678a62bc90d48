use std::cell::Cell;
use std::rc::Rc;

/// Marks a group of delayed work as belonging to one sequence.
///
/// A token is live until its [`TokenSource`] issues a newer one or is
/// cancelled outright. Checking a token is a single comparison, so callbacks
/// can test it right before acting.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    generation: u64,
    current: Rc<Cell<u64>>,
}

impl CancellationToken {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_cancelled(&self) -> bool {
        self.current.get() != self.generation
    }
}

impl PartialEq for CancellationToken {
    fn eq(&self, other: &Self) -> bool {
        self.generation == other.generation && Rc::ptr_eq(&self.current, &other.current)
    }
}

impl Eq for CancellationToken {}

#[derive(Debug, Clone, Default)]
pub struct TokenSource {
    current: Rc<Cell<u64>>,
}

impl TokenSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invalidates every earlier token and returns a fresh one.
    pub fn issue(&self) -> CancellationToken {
        let generation = self.current.get() + 1;
        self.current.set(generation);
        CancellationToken {
            generation,
            current: Rc::clone(&self.current),
        }
    }

    /// Invalidates every outstanding token without issuing a new one.
    pub fn cancel_all(&self) {
        self.current.set(self.current.get() + 1);
    }

    pub fn current_generation(&self) -> u64 {
        self.current.get()
    }
}
