use gale_a32::decoder::{DecodeTable, Matcher};

use super::{
    branch, data_processing as dp, exception_generating as exc, extension, load_store as mem,
    misc, multiply, parallel, status_register as sr, Handler,
};

fn inst(name: &'static str, bitstring: &'static str, handler: Handler) -> Matcher<Handler> {
    match Matcher::new(name, bitstring, handler) {
        Ok(matcher) => matcher,
        Err(err) => panic!("bad bitstring for {name}: {err}"),
    }
}

/// The conditional ARM decode table.
///
/// Declaration order is load-bearing: the first match wins, so encodings
/// that carve fixed bit patterns out of a wider space (multiplies and the
/// miscellaneous `0b00010xx0` group out of the data-processing space, the
/// extra load/stores out of the register-shift space) are listed before the
/// general patterns that would otherwise swallow them.
#[rustfmt::skip]
pub(super) fn arm_table() -> DecodeTable<Handler> {
    DecodeTable::new(vec![
        // Miscellaneous: the S=0 gap in the data-processing compare space.
        inst("mrs",   "cccc000100001111dddd000000000000", sr::mrs),
        inst("msr_reg","cccc00010010mmmm111100000000nnnn", sr::msr_reg),
        inst("bx",    "cccc000100101111111111110001mmmm", branch::bx),
        inst("blx_reg","cccc000100101111111111110011mmmm", branch::blx_reg),
        inst("bkpt",  "cccc00010010vvvvvvvvvvvv0111vvvv", exc::bkpt),
        inst("clz",   "cccc000101101111dddd11110001mmmm", misc::clz),

        // Multiplies: bits<7:4> = 1001 inside the data-processing space.
        inst("mul",   "cccc0000000Sdddd0000ssss1001mmmm", multiply::mul),
        inst("mla",   "cccc0000001Sddddaaaassss1001mmmm", multiply::mla),
        inst("smuad", "cccc01110000dddd1111mmmm00M1nnnn", multiply::smuad),

        // Extra load/stores: bits<7:4> = 1x11 inside the shift space.
        inst("ldrh_imm", "cccc000pu1w1nnnnddddvvvv1011vvvv", mem::ldrh_imm),
        inst("ldrh_reg", "cccc000pu0w1nnnndddd00001011mmmm", mem::ldrh_reg),
        inst("strh_imm", "cccc000pu1w0nnnnddddvvvv1011vvvv", mem::strh_imm),
        inst("strh_reg", "cccc000pu0w0nnnndddd00001011mmmm", mem::strh_reg),
        inst("ldrsb_imm","cccc000pu1w1nnnnddddvvvv1101vvvv", mem::ldrsb_imm),
        inst("ldrsb_reg","cccc000pu0w1nnnndddd00001101mmmm", mem::ldrsb_reg),
        inst("ldrsh_imm","cccc000pu1w1nnnnddddvvvv1111vvvv", mem::ldrsh_imm),
        inst("ldrsh_reg","cccc000pu0w1nnnndddd00001111mmmm", mem::ldrsh_reg),

        // Data processing, register and register-shifted-register forms.
        inst("and_reg", "cccc0000000Snnnnddddvvvvvrr0mmmm", dp::and_reg),
        inst("and_rsr", "cccc0000000Snnnnddddssss0rr1mmmm", dp::and_rsr),
        inst("eor_reg", "cccc0000001Snnnnddddvvvvvrr0mmmm", dp::eor_reg),
        inst("eor_rsr", "cccc0000001Snnnnddddssss0rr1mmmm", dp::eor_rsr),
        inst("sub_reg", "cccc0000010Snnnnddddvvvvvrr0mmmm", dp::sub_reg),
        inst("sub_rsr", "cccc0000010Snnnnddddssss0rr1mmmm", dp::sub_rsr),
        inst("rsb_reg", "cccc0000011Snnnnddddvvvvvrr0mmmm", dp::rsb_reg),
        inst("rsb_rsr", "cccc0000011Snnnnddddssss0rr1mmmm", dp::rsb_rsr),
        inst("add_reg", "cccc0000100Snnnnddddvvvvvrr0mmmm", dp::add_reg),
        inst("add_rsr", "cccc0000100Snnnnddddssss0rr1mmmm", dp::add_rsr),
        inst("adc_reg", "cccc0000101Snnnnddddvvvvvrr0mmmm", dp::adc_reg),
        inst("adc_rsr", "cccc0000101Snnnnddddssss0rr1mmmm", dp::adc_rsr),
        inst("sbc_reg", "cccc0000110Snnnnddddvvvvvrr0mmmm", dp::sbc_reg),
        inst("sbc_rsr", "cccc0000110Snnnnddddssss0rr1mmmm", dp::sbc_rsr),
        inst("rsc_reg", "cccc0000111Snnnnddddvvvvvrr0mmmm", dp::rsc_reg),
        inst("rsc_rsr", "cccc0000111Snnnnddddssss0rr1mmmm", dp::rsc_rsr),
        inst("tst_reg", "cccc00010001nnnn0000vvvvvrr0mmmm", dp::tst_reg),
        inst("tst_rsr", "cccc00010001nnnn0000ssss0rr1mmmm", dp::tst_rsr),
        inst("teq_reg", "cccc00010011nnnn0000vvvvvrr0mmmm", dp::teq_reg),
        inst("teq_rsr", "cccc00010011nnnn0000ssss0rr1mmmm", dp::teq_rsr),
        inst("cmp_reg", "cccc00010101nnnn0000vvvvvrr0mmmm", dp::cmp_reg),
        inst("cmp_rsr", "cccc00010101nnnn0000ssss0rr1mmmm", dp::cmp_rsr),
        inst("cmn_reg", "cccc00010111nnnn0000vvvvvrr0mmmm", dp::cmn_reg),
        inst("cmn_rsr", "cccc00010111nnnn0000ssss0rr1mmmm", dp::cmn_rsr),
        inst("orr_reg", "cccc0001100Snnnnddddvvvvvrr0mmmm", dp::orr_reg),
        inst("orr_rsr", "cccc0001100Snnnnddddssss0rr1mmmm", dp::orr_rsr),
        inst("mov_reg", "cccc0001101S0000ddddvvvvvrr0mmmm", dp::mov_reg),
        inst("mov_rsr", "cccc0001101S0000ddddssss0rr1mmmm", dp::mov_rsr),
        inst("bic_reg", "cccc0001110Snnnnddddvvvvvrr0mmmm", dp::bic_reg),
        inst("bic_rsr", "cccc0001110Snnnnddddssss0rr1mmmm", dp::bic_rsr),
        inst("mvn_reg", "cccc0001111S0000ddddvvvvvrr0mmmm", dp::mvn_reg),
        inst("mvn_rsr", "cccc0001111S0000ddddssss0rr1mmmm", dp::mvn_rsr),

        // MSR immediate sits in the S=0 gap of the immediate compare space.
        inst("msr_imm", "cccc00110010mmmm1111rrrrvvvvvvvv", sr::msr_imm),

        // Data processing, immediate forms.
        inst("and_imm", "cccc0010000Snnnnddddrrrrvvvvvvvv", dp::and_imm),
        inst("eor_imm", "cccc0010001Snnnnddddrrrrvvvvvvvv", dp::eor_imm),
        inst("sub_imm", "cccc0010010Snnnnddddrrrrvvvvvvvv", dp::sub_imm),
        inst("rsb_imm", "cccc0010011Snnnnddddrrrrvvvvvvvv", dp::rsb_imm),
        inst("add_imm", "cccc0010100Snnnnddddrrrrvvvvvvvv", dp::add_imm),
        inst("adc_imm", "cccc0010101Snnnnddddrrrrvvvvvvvv", dp::adc_imm),
        inst("sbc_imm", "cccc0010110Snnnnddddrrrrvvvvvvvv", dp::sbc_imm),
        inst("rsc_imm", "cccc0010111Snnnnddddrrrrvvvvvvvv", dp::rsc_imm),
        inst("tst_imm", "cccc00110001nnnn0000rrrrvvvvvvvv", dp::tst_imm),
        inst("teq_imm", "cccc00110011nnnn0000rrrrvvvvvvvv", dp::teq_imm),
        inst("cmp_imm", "cccc00110101nnnn0000rrrrvvvvvvvv", dp::cmp_imm),
        inst("cmn_imm", "cccc00110111nnnn0000rrrrvvvvvvvv", dp::cmn_imm),
        inst("orr_imm", "cccc0011100Snnnnddddrrrrvvvvvvvv", dp::orr_imm),
        inst("mov_imm", "cccc0011101S0000ddddrrrrvvvvvvvv", dp::mov_imm),
        inst("bic_imm", "cccc0011110Snnnnddddrrrrvvvvvvvv", dp::bic_imm),
        inst("mvn_imm", "cccc0011111S0000ddddrrrrvvvvvvvv", dp::mvn_imm),

        // Parallel add/subtract, exchange family.
        inst("sasx",  "cccc01100001nnnndddd11110011mmmm", parallel::sasx),
        inst("ssax",  "cccc01100001nnnndddd11110101mmmm", parallel::ssax),
        inst("shasx", "cccc01100011nnnndddd11110011mmmm", parallel::shasx),
        inst("shsax", "cccc01100011nnnndddd11110101mmmm", parallel::shsax),
        inst("uasx",  "cccc01100101nnnndddd11110011mmmm", parallel::uasx),
        inst("usax",  "cccc01100101nnnndddd11110101mmmm", parallel::usax),

        // Extensions.
        inst("sxtb", "cccc011010101111ddddrr000111mmmm", extension::sxtb),
        inst("sxth", "cccc011010111111ddddrr000111mmmm", extension::sxth),
        inst("uxtb", "cccc011011101111ddddrr000111mmmm", extension::uxtb),
        inst("uxth", "cccc011011111111ddddrr000111mmmm", extension::uxth),

        // UDF is the permanently undefined encoding.
        inst("udf", "111001111111vvvvvvvvvvvv1111vvvv", exc::udf),

        // Single load/stores.
        inst("ldr_imm",  "cccc010pu0w1nnnnddddvvvvvvvvvvvv", mem::ldr_imm),
        inst("str_imm",  "cccc010pu0w0nnnnddddvvvvvvvvvvvv", mem::str_imm),
        inst("ldrb_imm", "cccc010pu1w1nnnnddddvvvvvvvvvvvv", mem::ldrb_imm),
        inst("strb_imm", "cccc010pu1w0nnnnddddvvvvvvvvvvvv", mem::strb_imm),
        inst("ldr_reg",  "cccc011pu0w1nnnnddddvvvvvrr0mmmm", mem::ldr_reg),
        inst("str_reg",  "cccc011pu0w0nnnnddddvvvvvrr0mmmm", mem::str_reg),
        inst("ldrb_reg", "cccc011pu1w1nnnnddddvvvvvrr0mmmm", mem::ldrb_reg),
        inst("strb_reg", "cccc011pu1w0nnnnddddvvvvvrr0mmmm", mem::strb_reg),

        // Block transfers.
        inst("ldm", "cccc100pu0w1nnnnrrrrrrrrrrrrrrrr", mem::ldm),
        inst("stm", "cccc100pu0w0nnnnrrrrrrrrrrrrrrrr", mem::stm),

        // Branches.
        inst("b",  "cccc1010vvvvvvvvvvvvvvvvvvvvvvvv", branch::b),
        inst("bl", "cccc1011vvvvvvvvvvvvvvvvvvvvvvvv", branch::bl),

        // Supervisor call.
        inst("svc", "cccc1111vvvvvvvvvvvvvvvvvvvvvvvv", exc::svc),
    ])
}

/// The unconditional (`0b1111` condition field) space. Only the memory
/// hints execute; everything else raises UndefinedInstruction.
#[rustfmt::skip]
pub(super) fn unconditional_table() -> DecodeTable<Handler> {
    DecodeTable::new(vec![
        inst("pld_imm", "11110101u101nnnn1111vvvvvvvvvvvv", misc::hint),
        inst("pld_reg", "11110111u101nnnn1111vvvvvrr0mmmm", misc::hint),
    ])
}
