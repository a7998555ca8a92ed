use gale_a32::{Fpscr, LocationDescriptor, Psr, Reg};
use gale_ir::opt;
use gale_ir::{IrBuilder, Terminal, Value};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Step {
    Get(u8),
    AddImm(u32),
    EorImm(u32),
    ShiftImm(u8),
    Store(u8),
    SetFlagsFromLast,
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        (0u8..15).prop_map(Step::Get),
        any::<u32>().prop_map(Step::AddImm),
        any::<u32>().prop_map(Step::EorImm),
        (0u8..32).prop_map(Step::ShiftImm),
        (0u8..15).prop_map(Step::Store),
        Just(Step::SetFlagsFromLast),
    ]
}

fn build_block(steps: &[Step]) -> gale_ir::Block {
    let loc = LocationDescriptor::new(0x1000, Psr::new(0x1D0), Fpscr::new(0));
    let mut ir = IrBuilder::new(loc);
    let mut last = Value::u32(0);
    for step in steps {
        match *step {
            Step::Get(r) => last = ir.get_register(Reg::from_bits(r.into())),
            Step::AddImm(imm) => {
                last = ir.add_with_carry(last, Value::u32(imm), Value::u1(false));
            }
            Step::EorImm(imm) => last = ir.eor(last, Value::u32(imm)),
            Step::ShiftImm(n) => last = ir.lsl(last, Value::u8(n), Value::u1(false)),
            Step::Store(r) => ir.set_register(Reg::from_bits(r.into()), last),
            Step::SetFlagsFromLast => {
                let n = ir.most_significant_bit(last);
                ir.set_n_flag(n);
                let z = ir.is_zero(last);
                ir.set_z_flag(z);
            }
        }
    }
    ir.set_register(Reg::R0, last);
    ir.set_terminal(Terminal::ReturnToDispatch);
    ir.into_block()
}

fn run_pipeline(block: &mut gale_ir::Block) {
    opt::get_set_elimination(block);
    opt::dead_code_elimination(block);
    opt::constant_propagation(block);
    opt::dead_code_elimination(block);
}

fn listing(block: &gale_ir::Block) -> Vec<String> {
    block.iter_live().map(|(id, i)| format!("%{} = {}", id.index(), i)).collect()
}

proptest! {
    // Running the pass pipeline a second time must change nothing.
    #[test]
    fn pipeline_is_idempotent(steps in proptest::collection::vec(step_strategy(), 0..24)) {
        let mut block = build_block(&steps);
        run_pipeline(&mut block);
        let once = listing(&block);
        run_pipeline(&mut block);
        let twice = listing(&block);
        prop_assert_eq!(once, twice);
    }

    // The pipeline never produces IR the verifier rejects.
    #[test]
    fn pipeline_output_verifies(steps in proptest::collection::vec(step_strategy(), 0..24)) {
        let mut block = build_block(&steps);
        run_pipeline(&mut block);
        prop_assert_eq!(opt::verify(&block), Ok(()));
    }
}
