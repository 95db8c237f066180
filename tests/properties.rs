//! Randomized coverage of the durability and region-registry invariants,
//! run against the public `pmem_trace` surface rather than any one
//! module in isolation.

use pmem_trace::{Config, OverlapKind, PmemChecker};
use proptest::prelude::*;

fn interval_strategy() -> impl Strategy<Value = (u64, u64)> {
    (0u64..4096, 1u64..256)
}

proptest! {
    // P1: every interval registered into an otherwise-empty registry must
    // classify as present (not `NotPresent`) once registration completes.
    #[test]
    fn p1_registered_intervals_are_never_not_present(
        ops in proptest::collection::vec(interval_strategy(), 0..32)
    ) {
        let mut c = PmemChecker::new(Config::default());
        for (addr, size) in &ops {
            c.register_mapping(*addr, *size);
        }
        for (addr, size) in &ops {
            prop_assert_ne!(c.classify_mapping(*addr, *size), OverlapKind::NotPresent);
        }
    }

    // P2: registration order doesn't matter for the resulting classification
    // of a pair of touching-or-overlapping intervals.
    #[test]
    fn p2_registration_order_is_commutative(
        (a_addr, a_size) in interval_strategy(),
        gap in 0u64..32,
        b_size in 1u64..256,
    ) {
        let b_addr = a_addr + a_size + gap;
        let mut forward = PmemChecker::new(Config::default());
        forward.register_mapping(a_addr, a_size);
        forward.register_mapping(b_addr, b_size);

        let mut backward = PmemChecker::new(Config::default());
        backward.register_mapping(b_addr, b_size);
        backward.register_mapping(a_addr, a_size);

        let probe_addr = a_addr;
        let probe_size = (b_addr + b_size) - a_addr;
        prop_assert_eq!(
            forward.classify_mapping(probe_addr, probe_size),
            backward.classify_mapping(probe_addr, probe_size)
        );
    }

    // P3: deregistering an interval and then classifying it returns
    // `NotPresent`.
    #[test]
    fn p3_deregister_then_classify_is_not_present(
        (addr, size) in interval_strategy(),
    ) {
        let mut c = PmemChecker::new(Config::default());
        c.register_mapping(addr, size);
        c.remove_mapping(addr, size);
        prop_assert_eq!(c.classify_mapping(addr, size), OverlapKind::NotPresent);
    }

    // P5: fence() and commit() are each idempotent -- calling either twice
    // in a row leaves the reporter summary unchanged.
    #[test]
    fn p5_fence_and_commit_are_idempotent(
        (addr, size) in interval_strategy(),
        value in any::<u64>(),
    ) {
        let mut c = PmemChecker::new(Config::default());
        c.register_mapping(addr, size);
        c.on_store(addr, size, value);
        c.flush(addr, size);

        c.fence();
        let after_first_fence = c.summary().non_persistent.len();
        c.fence();
        let after_second_fence = c.summary().non_persistent.len();
        prop_assert_eq!(after_first_fence, after_second_fence);

        c.commit();
        let after_first_commit = c.summary().non_persistent.len();
        c.commit();
        let after_second_commit = c.summary().non_persistent.len();
        prop_assert_eq!(after_first_commit, after_second_commit);
    }

    // P7: byte-volume conservation across a flush/fence/commit/fence cycle
    // that fully covers the one store under test -- every byte that was
    // non-persistent beforehand is retired afterwards.
    #[test]
    fn p7_byte_volume_is_conserved_across_a_full_cycle(
        addr in 0u64..4096,
        store_size in 1u64..64,
        value in any::<u64>(),
    ) {
        let mapping_size = store_size + 64;
        let mut c = PmemChecker::new(Config::default());
        c.register_mapping(addr, mapping_size);
        c.on_store(addr, store_size, value);

        let before = c.summary().non_persistent_bytes();
        prop_assert_eq!(before, store_size);

        c.flush(addr, mapping_size);
        c.fence();
        c.commit();
        c.fence();

        let after = c.summary().non_persistent_bytes();
        prop_assert_eq!(after, 0);
    }
}
