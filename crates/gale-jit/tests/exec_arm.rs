mod common;

use common::{jit_with_code, CPSR_USER};

const B_DOT: u32 = 0xEAFF_FFFE; // b .

// cmp pc, #55552; tst r12, r4 ror r4; mov r0, r7 lsr #13;
// cmp r1, #0x3E80000; adc r4, r5, #35328; b .
#[test]
fn arithmetic_with_carry_across_flag_writers() {
    let code = [
        0xE35F_0CD9, 0xE11C_0474, 0xE1A0_06A7, 0xE351_07FA, 0xE2A5_4C8A, B_DOT,
    ];
    let mut jit = jit_with_code(&code, 6);
    let input = [
        0x1111_1111, // r0
        0x03F0_0000, // r1: cmp leaves C set, N/Z/V clear
        0x2222_2222,
        0x3333_3333,
        0x4444_4444, // r4: overwritten by the adc
        0xCF89_B8C7, // r5
        0x5555_5555,
        0x015E_2000, // r7: >> 13 == 0xAF1
        0x6666_6666,
        0x7777_7777,
        0x8888_8888,
        0x9999_9999,
        0xAAAA_AAAA, // r12
        0xBBBB_BBBB,
        0xCCCC_CCCC,
        0x0000_0000, // r15
    ];
    *jit.regs_mut() = input;

    jit.run();

    let regs = jit.regs();
    assert_eq!(regs[0], 0x0000_0AF1);
    assert_eq!(regs[4], 0xCF8A_42C8);
    assert_eq!(jit.cpsr(), 0x2000_01D0);
    assert_eq!(regs[15], 0x14);
    for i in [1, 2, 3, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14] {
        assert_eq!(regs[i], input[i], "r{i} changed");
    }
    // One six-instruction block executed: one accounting call on its exit.
    assert_eq!(jit.callbacks().ticks_added, 6);
    assert_eq!(jit.callbacks().add_ticks_calls, vec![6]);
}

// shsax r11, sp, r9; b .
#[test]
fn shsax_halving_exchange() {
    let mut jit = jit_with_code(&[0xE63D_BF59, B_DOT], 2);
    jit.regs_mut()[13] = 0x2F7F_B1D4;
    jit.regs_mut()[9] = 0x1749_8000;

    jit.run();

    assert_eq!(jit.regs()[11], 0x57BF_E48E);
    assert_eq!(jit.regs()[15], 4);
    assert_eq!(jit.cpsr(), CPSR_USER);
}

// uasx r9, r4, r5; b .
#[test]
fn uasx_updates_ge_flags() {
    let mut jit = jit_with_code(&[0xE654_9F35, B_DOT], 2);
    jit.regs_mut()[4] = 0x8ED3_8F4C;
    jit.regs_mut()[5] = 0x0000_261D;

    jit.run();

    assert_eq!(jit.regs()[9], 0xB4F0_8F4C);
    assert_eq!(jit.cpsr(), 0x0003_01D0);
}

// smuad r0, r1, r2; b .
#[test]
fn smuad_overflow_sets_q() {
    let mut jit = jit_with_code(&[0xE700_F211, B_DOT], 2);
    jit.regs_mut()[1] = 0x8000_8000;
    jit.regs_mut()[2] = 0x8000_8000;

    jit.run();

    assert_eq!(jit.regs()[0], 0x8000_0000);
    assert_eq!(jit.cpsr(), 0x0800_01D0);
}

// movs r0, #0; moveq r1, #1; movne r2, #2; b .
#[test]
fn conditional_execution_follows_the_flags() {
    let code = [0xE3B0_0000, 0x03A0_1001, 0x13A0_2002, B_DOT];
    let mut jit = jit_with_code(&code, 4);
    jit.regs_mut()[1] = 0xDEAD_0001;
    jit.regs_mut()[2] = 0xDEAD_0002;

    jit.run();

    assert_eq!(jit.regs()[0], 0);
    assert_eq!(jit.regs()[1], 1, "eq path must execute");
    assert_eq!(jit.regs()[2], 0xDEAD_0002, "ne path must be skipped");
    assert_eq!(jit.cpsr(), 0x4000_01D0);
    assert_eq!(jit.regs()[15], 0xC);
}

// ldr r0, [r1, #4]; add r0, r0, #1; str r0, [r1, #8]!; b .
#[test]
fn load_store_with_writeback() {
    let code = [0xE591_0004, 0xE280_0001, 0xE5A1_0008, B_DOT];
    let mut jit = jit_with_code(&code, 4);
    jit.regs_mut()[1] = 0x1000;
    jit.callbacks_mut().write_u32(0x1004, 0x41);

    jit.run();

    assert_eq!(jit.regs()[0], 0x42);
    assert_eq!(jit.callbacks().read_u32(0x1008), 0x42);
    assert_eq!(jit.regs()[1], 0x1008, "base writeback");
}

// ldm/stm round: stmdb sp!, {r0, r1, lr}; ldmia sp!, {r2, r3, r4}; b .
#[test]
fn block_transfers_move_the_stack() {
    let code = [0xE92D_4003, 0xE8BD_001C, B_DOT];
    let mut jit = jit_with_code(&code, 3);
    jit.regs_mut()[0] = 0x1111;
    jit.regs_mut()[1] = 0x2222;
    jit.regs_mut()[14] = 0x3333;
    jit.regs_mut()[13] = 0x2000;

    jit.run();

    assert_eq!(jit.regs()[13], 0x2000, "push then pop restores sp");
    assert_eq!(jit.regs()[2], 0x1111);
    assert_eq!(jit.regs()[3], 0x2222);
    assert_eq!(jit.regs()[4], 0x3333);
}

// bl 0x10; b . / at 0x10: bx lr
#[test]
fn call_and_return_through_the_rsb() {
    let mut jit = jit_with_code(&[0xEB00_0002, B_DOT], 3);
    jit.callbacks_mut().write_code(0x10, &[0xE12F_FF1E]);

    jit.run();

    assert_eq!(jit.regs()[14], 4);
    assert_eq!(jit.regs()[15], 4);

    // Second pass: the return target is compiled now, so the RSB entry
    // resolves and the return takes the hinted path.
    jit.regs_mut()[15] = 0;
    jit.callbacks_mut().ticks = 3;
    jit.run();
    assert_eq!(jit.regs()[15], 4);
}

// svc #0x42; mov r0, #9; b .
#[test]
fn supervisor_call_reports_and_returns() {
    let code = [0xEF00_0042, 0xE3A0_0009, B_DOT];
    let mut jit = jit_with_code(&code, 3);

    jit.run();

    assert_eq!(jit.callbacks().supervisor_calls, vec![0x42]);
    assert_eq!(jit.regs()[0], 9);
    assert_eq!(jit.regs()[15], 8);
    // Two block exits: the svc block, then the mov/branch block.
    assert_eq!(jit.callbacks().add_ticks_calls, vec![1, 2]);
}

// bkpt #0; executed once per tick, reporting each time.
#[test]
fn breakpoint_reaches_the_consumer() {
    let mut jit = jit_with_code(&[0xE120_0070], 1);

    jit.run();

    assert_eq!(
        jit.callbacks().exceptions,
        vec![(0, gale_a32::Exception::Breakpoint)]
    );
    assert_eq!(jit.regs()[15], 0);
    assert_eq!(jit.cpsr(), CPSR_USER);
}

// udf; udf; mov r0, #5; b . — the two bails merge into one interpreter run.
#[test]
fn interpret_fallbacks_merge() {
    let code = [0xE7F0_00F0, 0xE7F0_00F0, 0xE3A0_0005, B_DOT];
    let mut jit = jit_with_code(&code, 4);

    jit.run();

    assert_eq!(jit.callbacks().fallback_calls, vec![(0, 2)]);
    assert_eq!(jit.regs()[0], 5);
    assert_eq!(jit.regs()[15], 0xC);
}

// Indirect branches take the fast-dispatch path; disabling the table may
// only change the path taken, never the result.
#[test]
fn indirect_branch_with_and_without_fast_dispatch() {
    for enable in [true, false] {
        let code = [0xE3A0_3020, 0xE12F_FF13, B_DOT]; // mov r3, #0x20; bx r3
        let mut env = common::TestEnv::with_code(&code);
        env.write_code(0x20, &[0xE3A0_7007, B_DOT]); // mov r7, #7; b .
        env.ticks = 4;
        let mut config = gale_jit::UserConfig::default();
        config.enable_fast_dispatch = enable;
        let mut jit = gale_jit::Jit::new(config, env);
        jit.set_cpsr(CPSR_USER);

        jit.run();

        assert_eq!(jit.regs()[7], 7, "fast dispatch {enable}");
        assert_eq!(jit.regs()[15], 0x24);
    }
}
