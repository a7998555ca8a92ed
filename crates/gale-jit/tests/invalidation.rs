mod common;

use common::jit_with_code;

const B_DOT: u32 = 0xEAFF_FFFE;

// mov r0, #5; mov r1, #13; add r2, r1, r0; b .
const PROGRAM: [u32; 4] = [0xE3A0_0005, 0xE3A0_100D, 0xE081_2000, B_DOT];
const MOV_R1_7: u32 = 0xE3A0_1007;

#[test]
fn invalidate_range_forces_retranslation() {
    let mut jit = jit_with_code(&PROGRAM, 4);
    jit.run();
    assert_eq!(jit.regs()[2], 18);

    // Overwrite `mov r1, #13` with `mov r1, #7` and invalidate that word.
    jit.callbacks_mut().write_code(4, &[MOV_R1_7]);
    jit.invalidate_range(4, 4);

    jit.regs_mut()[15] = 0;
    jit.callbacks_mut().ticks = 4;
    jit.run();
    assert_eq!(jit.regs()[2], 12);
}

// The core does not watch guest memory: without the invalidation call the
// stale translation keeps running.
#[test]
fn guest_code_writes_alone_do_not_invalidate() {
    let mut jit = jit_with_code(&PROGRAM, 4);
    jit.run();
    assert_eq!(jit.regs()[2], 18);

    jit.callbacks_mut().write_code(4, &[MOV_R1_7]);

    jit.regs_mut()[15] = 0;
    jit.callbacks_mut().ticks = 4;
    jit.run();
    assert_eq!(jit.regs()[2], 18, "stale block must still be in use");
}

#[test]
fn invalidating_an_untranslated_range_is_harmless() {
    let mut jit = jit_with_code(&PROGRAM, 4);
    jit.run();
    assert_eq!(jit.regs()[2], 18);

    jit.invalidate_range(0x8000, 16);

    jit.regs_mut()[15] = 0;
    jit.callbacks_mut().ticks = 4;
    jit.run();
    assert_eq!(jit.regs()[2], 18);
}

#[test]
fn clear_cache_retranslates_everything() {
    let mut jit = jit_with_code(&PROGRAM, 4);
    jit.run();
    assert_eq!(jit.regs()[2], 18);

    jit.callbacks_mut().write_code(4, &[MOV_R1_7]);
    jit.clear_cache();

    jit.regs_mut()[15] = 0;
    jit.callbacks_mut().ticks = 4;
    jit.run();
    assert_eq!(jit.regs()[2], 12);
}

// Invalidation queued through the cross-thread handle is serviced at the
// next safe point: the entry to the following run.
#[test]
fn queued_invalidation_is_serviced_before_the_next_run() {
    let mut jit = jit_with_code(&PROGRAM, 4);
    let handle = jit.invalidation_handle();
    jit.run();
    assert_eq!(jit.regs()[2], 18);

    jit.callbacks_mut().write_code(4, &[MOV_R1_7]);
    handle.invalidate_range(4, 4);

    jit.regs_mut()[15] = 0;
    jit.callbacks_mut().ticks = 4;
    jit.run();
    assert_eq!(jit.regs()[2], 12);
}

// A tiny arena forces the capacity path: every miss below the headroom
// triggers a full flush, and execution stays correct throughout.
#[test]
fn arena_exhaustion_self_heals_with_a_full_flush() {
    let mut env = common::TestEnv::with_code(&PROGRAM);
    env.write_code(0x100, &[0xE3A0_4001, B_DOT]); // mov r4, #1; b .
    env.write_code(0x200, &[0xE3A0_5002, B_DOT]); // mov r5, #2; b .
    env.ticks = 4;
    let mut config = gale_jit::UserConfig::default();
    config.arena_capacity = 1024 * 1024 + 512; // headroom + almost nothing
    let mut jit = gale_jit::Jit::new(config, env);
    jit.set_cpsr(common::CPSR_USER);

    for _ in 0..3 {
        for (entry, check) in [(0u32, 2usize), (0x100, 4), (0x200, 5)] {
            jit.regs_mut()[15] = entry;
            jit.callbacks_mut().ticks = 4;
            jit.run();
            match check {
                2 => assert_eq!(jit.regs()[2], 18),
                4 => assert_eq!(jit.regs()[4], 1),
                _ => assert_eq!(jit.regs()[5], 2),
            }
        }
    }
}

// Blocks partially overlapping the invalidated range are retranslated too.
#[test]
fn overlap_at_the_edge_counts() {
    let mut jit = jit_with_code(&PROGRAM, 4);
    jit.run();
    assert_eq!(jit.regs()[2], 18);

    jit.callbacks_mut().write_code(4, &[MOV_R1_7]);
    // Only the last byte of the block's range.
    jit.invalidate_range(0xF, 1);

    jit.regs_mut()[15] = 0;
    jit.callbacks_mut().ticks = 4;
    jit.run();
    assert_eq!(jit.regs()[2], 12);
}
