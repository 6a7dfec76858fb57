//! Job shop — machines, breakdowns, and a shared repair crew.
//!
//! Demonstrates:
//!   1. Processes looping over shared work queues
//!   2. All-or-nothing allocation of a capacity-bounded resource
//!   3. Contention: machines queue up for the single repair crew
//!   4. Deterministic randomness from a seeded ChaCha8 RNG
//!
//! Run with:
//!   cargo run --example job_shop

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use skein_core::{Capability, ElementKey, InstanceIndex, TimePeriod};
use skein_engine::instruction::{
    handle, AllocateInstruction, ReleaseInstruction, WaitInstruction,
};
use skein_engine::{
    InstructionHandle, InstructionSequence, Process, ProcessCore, ProcessState, Resource,
    SimulationContext, SimulationElement, Simulator,
};

// ─── Shop parameters ────────────────────────────────────────────

const REPAIR_CREW: Capability = Capability::user(0);
const MACHINE_COUNT: usize = 3;
const JOBS_PER_MACHINE: usize = 8;
const RELIABILITY: f64 = 0.85;
const REPAIR_TIME: u64 = 6;
const SEED: u64 = 42;

// ─── Machine statistics shared with the continuation ────────────

#[derive(Default)]
struct MachineStats {
    processed: Cell<u32>,
    breakdowns: Cell<u32>,
}

// ─── The machine process ────────────────────────────────────────

struct Machine {
    core: ProcessCore,
    jobs: Rc<RefCell<VecDeque<u64>>>,
    stats: Rc<MachineStats>,
    seed: u64,
}

impl Machine {
    fn new(
        ctx: &Rc<SimulationContext>,
        name: &str,
        jobs: Rc<RefCell<VecDeque<u64>>>,
        seed: u64,
    ) -> (Rc<RefCell<Machine>>, Rc<MachineStats>) {
        let stats = Rc::new(MachineStats::default());
        let machine = Rc::new(RefCell::new(Machine {
            core: ProcessCore::with_key(ctx, name),
            jobs,
            stats: Rc::clone(&stats),
            seed,
        }));
        ctx.register_process(Rc::clone(&machine));
        (machine, stats)
    }
}

impl SimulationElement for Machine {
    fn key(&self) -> &ElementKey {
        self.core.key()
    }

    fn capabilities(&self) -> &[Capability] {
        ProcessCore::capabilities()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn as_process(&self) -> Option<&dyn Process> {
        Some(self)
    }
}

impl Process for Machine {
    fn instance_index(&self) -> InstanceIndex {
        self.core.instance_index()
    }

    fn state(&self) -> &ProcessState {
        self.core.state()
    }

    fn state_mut(&mut self) -> &mut ProcessState {
        self.core.state_mut()
    }

    fn simulate(&mut self) -> InstructionSequence {
        Box::new(MachineRun {
            jobs: Rc::clone(&self.jobs),
            stats: Rc::clone(&self.stats),
            rng: ChaCha8Rng::seed_from_u64(self.seed),
            stage: Stage::TakeJob,
        })
    }
}

// ─── The machine's resumable work loop ──────────────────────────

enum Stage {
    /// Pick the next job off the queue, or finish.
    TakeJob,
    /// A job's work wait just completed; check for a breakdown.
    JobDone,
    /// A repair crew was requested; wait out the repair once granted.
    CrewGranted(Rc<RefCell<AllocateInstruction>>),
    /// The repair wait completed; hand the crew back.
    Repaired(Rc<RefCell<AllocateInstruction>>),
}

struct MachineRun {
    jobs: Rc<RefCell<VecDeque<u64>>>,
    stats: Rc<MachineStats>,
    rng: ChaCha8Rng,
    stage: Stage,
}

impl MachineRun {
    fn broke_down(&mut self) -> bool {
        let roll = self.rng.next_u32() as f64 / u32::MAX as f64;
        roll > RELIABILITY
    }
}

impl Iterator for MachineRun {
    type Item = InstructionHandle;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match std::mem::replace(&mut self.stage, Stage::TakeJob) {
                Stage::TakeJob => {
                    let job = self.jobs.borrow_mut().pop_front();
                    match job {
                        Some(duration) => {
                            self.stage = Stage::JobDone;
                            return Some(handle(WaitInstruction::new(duration)));
                        }
                        // Out of work: the machine's run is over.
                        None => return None,
                    }
                }
                Stage::JobDone => {
                    if self.broke_down() {
                        self.stats.breakdowns.set(self.stats.breakdowns.get() + 1);
                        let claim = Rc::new(RefCell::new(AllocateInstruction::new(REPAIR_CREW, 1)));
                        self.stage = Stage::CrewGranted(Rc::clone(&claim));
                        return Some(claim as InstructionHandle);
                    }
                    self.stats.processed.set(self.stats.processed.get() + 1);
                    self.stage = Stage::TakeJob;
                }
                Stage::CrewGranted(claim) => {
                    self.stage = Stage::Repaired(claim);
                    return Some(handle(WaitInstruction::new(REPAIR_TIME)));
                }
                Stage::Repaired(claim) => {
                    self.stats.processed.set(self.stats.processed.get() + 1);
                    self.stage = Stage::TakeJob;
                    return Some(handle(ReleaseInstruction::new(claim)));
                }
            }
        }
    }
}

fn main() {
    let ctx = SimulationContext::new();
    let _crew = Resource::with_key(&ctx, "repair-crew", REPAIR_CREW, 1);

    let mut machines = Vec::new();
    for m in 0..MACHINE_COUNT {
        let jobs: VecDeque<u64> = (0..JOBS_PER_MACHINE).map(|j| 2 + ((m + j) % 4) as u64).collect();
        let (machine, stats) = Machine::new(
            &ctx,
            &format!("machine-{m}"),
            Rc::new(RefCell::new(jobs)),
            SEED + m as u64,
        );
        machines.push((machine, stats));
    }

    let mut simulator = Simulator::new(Rc::clone(&ctx));
    simulator.simulate().expect("run completes");

    println!("shop closed at period {}", ctx.time_period());
    for (machine, stats) in &machines {
        println!(
            "{}: {} jobs done, {} breakdowns",
            machine.borrow().key(),
            stats.processed.get(),
            stats.breakdowns.get(),
        );
    }
    assert!(ctx.time_period() > TimePeriod(0));
}
