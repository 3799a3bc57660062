use std::sync::atomic::{AtomicI32, Ordering};

/// Allocates request ids for one client connection.
///
/// A wrapping 32-bit counter starting at `i32::MIN`. The protocol reserves
/// `-1` as the invalid-password signal, so that value is never handed out,
/// including after wrap-around.
#[derive(Debug)]
pub struct RequestIdProvider {
    counter: AtomicI32,
}

impl RequestIdProvider {
    pub fn new() -> Self {
        Self::starting_at(i32::MIN)
    }

    pub fn starting_at(value: i32) -> Self {
        Self {
            counter: AtomicI32::new(value),
        }
    }

    pub fn next_id(&self) -> i32 {
        loop {
            let id = self.counter.fetch_add(1, Ordering::Relaxed);
            if id != -1 {
                return id;
            }
        }
    }
}

impl Default for RequestIdProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn starts_at_i32_min_and_increments() {
        let provider = RequestIdProvider::new();
        assert_eq!(provider.next_id(), i32::MIN);
        assert_eq!(provider.next_id(), i32::MIN + 1);
    }

    #[test]
    fn ids_are_unique() {
        let provider = RequestIdProvider::new();
        let ids: HashSet<i32> = (0..1000).map(|_| provider.next_id()).collect();
        assert_eq!(ids.len(), 1000);
        assert!(!ids.contains(&-1));
    }

    #[test]
    fn skips_minus_one() {
        let provider = RequestIdProvider::starting_at(-3);
        assert_eq!(provider.next_id(), -3);
        assert_eq!(provider.next_id(), -2);
        assert_eq!(provider.next_id(), 0);
        assert_eq!(provider.next_id(), 1);
    }

    #[test]
    fn wraps_around_and_still_skips_minus_one() {
        let provider = RequestIdProvider::starting_at(i32::MAX);
        assert_eq!(provider.next_id(), i32::MAX);
        assert_eq!(provider.next_id(), i32::MIN);
    }
}
