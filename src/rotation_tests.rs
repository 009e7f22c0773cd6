//! Firing-rotation tests for serial/parallel composition scopes.
//!
//! These exercise the arena's reference semantics directly: the same
//! rotation the block-capable backends render into generated code.

#[cfg(test)]
mod tests {
    use crate::scope::{BlockArena, BlockKind};

    fn flat_block(kind: BlockKind, single: bool, members: &[&str]) -> BlockArena {
        let mut arena = BlockArena::new();
        arena.open_block(kind, single);
        for m in members {
            arena.register_member(m);
        }
        arena.close_block().unwrap();
        arena
    }

    // ═══════════════════════════════════════════════════════════════════════
    // SERIAL ROTATION
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn test_serial_accepts_full_rotation_in_order() {
        let mut arena = flat_block(BlockKind::Serial, false, &["a", "b", "c"]);
        for round in 0..2 {
            for name in ["a", "b", "c"] {
                assert!(arena.fire(name), "round {} member {}", round, name);
            }
        }
    }

    #[test]
    fn test_serial_rejects_out_of_order_firing() {
        let mut arena = flat_block(BlockKind::Serial, false, &["a", "b", "c"]);
        assert!(!arena.can_fire("b"));
        assert!(!arena.fire("c"));
        assert!(arena.fire("a"));
        assert!(!arena.fire("a"));
        assert!(!arena.fire("c"));
        assert!(arena.fire("b"));
    }

    #[test]
    fn test_serial_single_is_permanently_exhausted() {
        let mut arena = flat_block(BlockKind::Serial, true, &["a", "b"]);
        assert!(arena.fire("a"));
        assert!(arena.fire("b"));
        for name in ["a", "b"] {
            assert!(!arena.can_fire(name));
            assert!(!arena.fire(name));
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // PARALLEL CYCLES
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn test_parallel_accepts_every_permutation() {
        let perms: [[&str; 3]; 6] = [
            ["a", "b", "c"],
            ["a", "c", "b"],
            ["b", "a", "c"],
            ["b", "c", "a"],
            ["c", "a", "b"],
            ["c", "b", "a"],
        ];
        for perm in perms {
            let mut arena = flat_block(BlockKind::Parallel, false, &["a", "b", "c"]);
            for name in perm {
                assert!(arena.fire(name), "permutation {:?} member {}", perm, name);
            }
        }
    }

    #[test]
    fn test_parallel_rejects_double_fire_within_cycle() {
        let mut arena = flat_block(BlockKind::Parallel, false, &["a", "b", "c"]);
        assert!(arena.fire("b"));
        assert!(!arena.fire("b"));
        assert!(arena.fire("a"));
        assert!(arena.fire("c"));
        // Cycle complete: the set resets.
        assert!(arena.fire("b"));
    }

    #[test]
    fn test_parallel_single_is_permanently_exhausted() {
        let mut arena = flat_block(BlockKind::Parallel, true, &["a", "b"]);
        assert!(arena.fire("b"));
        assert!(arena.fire("a"));
        for name in ["a", "b"] {
            assert!(!arena.can_fire(name));
            assert!(!arena.fire(name));
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // NESTING
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn test_inner_cycle_advances_outer_block() {
        // serial1 [ parallel1 { a, b }, c ]
        let mut arena = BlockArena::new();
        arena.open_block(BlockKind::Serial, false);
        arena.open_block(BlockKind::Parallel, false);
        arena.register_member("a");
        arena.register_member("b");
        arena.close_block().unwrap();
        arena.register_member("c");
        arena.close_block().unwrap();

        // The cursor sits on parallel1; c is gated until the inner cycle ends.
        assert!(!arena.can_fire("c"));
        assert!(arena.fire("b"));
        assert!(!arena.can_fire("c"));
        assert!(arena.fire("a"));
        assert!(arena.can_fire("c"));
        assert!(arena.fire("c"));
        // Full outer rotation done; the next cycle starts at parallel1 again.
        assert!(arena.can_fire("a"));
        assert!(!arena.can_fire("c"));
    }

    #[test]
    fn test_nesting_gates_transitively() {
        // serial1 [ serial2 [ serial3 [ x ] ], y ]
        let mut arena = BlockArena::new();
        arena.open_block(BlockKind::Serial, false);
        arena.open_block(BlockKind::Serial, false);
        arena.open_block(BlockKind::Serial, false);
        arena.register_member("x");
        arena.close_block().unwrap();
        arena.close_block().unwrap();
        arena.register_member("y");
        arena.close_block().unwrap();

        assert!(arena.can_fire("x"));
        assert!(!arena.can_fire("y"));
        assert!(arena.fire("x"));
        // x's cycle completed serial3 and serial2, advancing serial1 past
        // serial2; the outer guard no longer holds for x's chain.
        assert!(!arena.can_fire("x"));
        assert!(arena.fire("y"));
        assert!(arena.can_fire("x"));
    }

    #[test]
    fn test_names_outside_blocks_always_fire() {
        let mut arena = BlockArena::new();
        assert!(arena.can_fire("iAnything"));
        assert!(arena.fire("iAnything"));
        assert!(arena.fire("iAnything"));
    }
}
