//! Transactions
//!
//! A transaction freezes time: every presentation computed inside it sees the
//! same `now`, and animations submitted inside it share the same start time.
//! Transactions nest, and a nested transaction inherits its parent's time.
//!
//! Writes made outside any explicit transaction get an implicit root
//! transaction that the scheduler commits at the end of the next tick.

/// One frozen timing scope
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transaction {
    /// Frozen time in seconds
    pub time: f64,
    /// Property writes inside this scope apply without animating
    pub disable_animation: bool,
    /// Popped by the scheduler at the end of a tick
    pub automatically_commit: bool,
}

/// Stack of open transactions
#[derive(Debug, Default)]
pub(crate) struct TransactionStack {
    stack: Vec<Transaction>,
}

impl TransactionStack {
    /// Push a new transaction; `now` is only read for a root transaction
    pub(crate) fn push(
        &mut self,
        now: impl FnOnce() -> f64,
        automatically_commit: bool,
    ) -> Transaction {
        let time = match self.stack.last() {
            Some(parent) => parent.time,
            None => now(),
        };
        let transaction = Transaction {
            time,
            disable_animation: false,
            automatically_commit,
        };
        self.stack.push(transaction);
        transaction
    }

    pub(crate) fn pop(&mut self) -> Option<Transaction> {
        self.stack.pop()
    }

    /// Top of the stack, opening an auto-committing root if empty
    pub(crate) fn current(&mut self, now: impl FnOnce() -> f64) -> &mut Transaction {
        if self.stack.is_empty() {
            self.push(now, true);
        }
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    pub(crate) fn top(&self) -> Option<&Transaction> {
        self.stack.last()
    }

    pub(crate) fn depth(&self) -> usize {
        self.stack.len()
    }
}
