//! Process-wide seeded random stream
//!
//! Gantree: L2_State → Rng
//!
//! Each thread owns a `ChaCha8Rng`. [`seed_rng`] publishes a seed and
//! bumps an epoch; a thread that sees a newer epoch rebuilds its
//! generator from the published seed before drawing. Threads started
//! before or after seeding therefore produce the same stream.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};

static SEED: AtomicU64 = AtomicU64::new(0);

// 0 means no seed has been published; threads then draw from OS entropy
static EPOCH: AtomicU64 = AtomicU64::new(0);

thread_local! {
    static RNG: RefCell<Option<(u64, ChaCha8Rng)>> = const { RefCell::new(None) };
}

/// Publish a global seed for every thread's generator
/// Gantree: seed_rng(u64) // 전역 시드
pub fn seed_rng(seed: u64) {
    SEED.store(seed, Ordering::Release);
    EPOCH.fetch_add(1, Ordering::AcqRel);
}

/// Seed last published with [`seed_rng`], if any
pub fn current_seed() -> Option<u64> {
    if EPOCH.load(Ordering::Acquire) == 0 {
        None
    } else {
        Some(SEED.load(Ordering::Acquire))
    }
}

/// Run `f` with this thread's generator
/// Gantree: with_rng(f) -> R // 스레드 로컬 RNG
pub fn with_rng<R>(f: impl FnOnce(&mut ChaCha8Rng) -> R) -> R {
    RNG.with(|cell| {
        let mut slot = cell.borrow_mut();
        let epoch = EPOCH.load(Ordering::Acquire);

        if !matches!(&*slot, Some((seen, _)) if *seen == epoch) {
            *slot = None;
        }

        let (_, rng) = slot.get_or_insert_with(|| {
            let rng = if epoch == 0 {
                ChaCha8Rng::from_entropy()
            } else {
                ChaCha8Rng::seed_from_u64(SEED.load(Ordering::Acquire))
            };
            (epoch, rng)
        });
        f(rng)
    })
}

/// Serializes tests that publish seeds; the seed is process-global
#[cfg(test)]
pub(crate) static TEST_SEED_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use std::thread;

    fn lock() -> std::sync::MutexGuard<'static, ()> {
        TEST_SEED_LOCK.lock().unwrap_or_else(|e| e.into_inner())
    }

    #[test]
    fn test_reseed_repeats_sequence() {
        let _guard = lock();
        seed_rng(7);
        let a: Vec<u32> = (0..5).map(|_| with_rng(|r| r.gen())).collect();
        seed_rng(7);
        let b: Vec<u32> = (0..5).map(|_| with_rng(|r| r.gen())).collect();
        assert_eq!(a, b);
        assert_eq!(current_seed(), Some(7));
    }

    #[test]
    fn test_seed_before_and_after_thread_start() {
        let _guard = lock();
        const N: usize = 8;

        seed_rng(123);
        let before: Vec<u32> = (0..N)
            .map(|_| thread::spawn(|| with_rng(|r| r.gen::<u32>())))
            .collect::<Vec<_>>()
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect();

        let go = Arc::new(AtomicBool::new(false));
        let handles: Vec<_> = (0..N)
            .map(|_| {
                let go = Arc::clone(&go);
                thread::spawn(move || {
                    while !go.load(Ordering::Acquire) {
                        thread::yield_now();
                    }
                    with_rng(|r| r.gen::<u32>())
                })
            })
            .collect();
        seed_rng(123);
        go.store(true, Ordering::Release);
        let after: Vec<u32> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(before, after);
    }

    #[test]
    fn test_different_seeds_differ() {
        let _guard = lock();
        seed_rng(1);
        let a: u64 = with_rng(|r| r.gen());
        seed_rng(2);
        let b: u64 = with_rng(|r| r.gen());
        assert_ne!(a, b);
    }
}
