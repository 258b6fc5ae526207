use std::sync::{Mutex, MutexGuard};

use tracing::warn;

/// Lock `lock`, recovering the guard if a previous holder panicked.
pub(crate) fn mutex_lock<'a, T>(
    lock: &'a Mutex<T>,
    target: &'static str,
    op: &'static str,
) -> MutexGuard<'a, T> {
    match lock.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!(
                op,
                target_module = target,
                lock_kind = "mutex.lock",
                result = "poisoned_recovered",
                "Recovered from poisoned lock"
            );
            poisoned.into_inner()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[test]
    fn recovers_value_after_panicking_holder() {
        let shared = Arc::new(Mutex::new(41));
        let cloned = Arc::clone(&shared);
        let _ = std::thread::spawn(move || {
            let _guard = cloned.lock();
            panic!("poison the lock");
        })
        .join();

        let mut guard = mutex_lock(&shared, "util::lock::tests", "increment");
        *guard += 1;
        assert_eq!(*guard, 42);
    }
}
