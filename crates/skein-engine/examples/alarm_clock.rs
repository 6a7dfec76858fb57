//! Alarm clock — scheduling activities and waking on notifications.
//!
//! Demonstrates:
//!   1. A process that sleeps until a typed notification arrives
//!   2. Activities hosted after a fixed delay via ScheduleActivity
//!   3. Driving a context to completion with the Simulator
//!
//! Run with:
//!   cargo run --example alarm_clock

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use skein_core::{Capability, ElementKey, InstanceIndex};
use skein_engine::instruction::{
    handle, RaiseNotificationInstruction, ScheduleActivityInstruction, WaitNotificationInstruction,
};
use skein_engine::{
    Activity, ActivityHandle, InstructionSequence, Process, ProcessCore, ProcessState,
    SimulationContext, SimulationElement, Simulator,
};

// ─── Notifications ──────────────────────────────────────────────

#[derive(Clone)]
struct AlarmRinging;

#[derive(Clone)]
struct Awake;

// ─── The alarm: an activity that rings once ─────────────────────

struct AlarmActivity;

impl Activity for AlarmActivity {
    fn simulate(&mut self) -> InstructionSequence {
        Box::new(std::iter::once(handle(RaiseNotificationInstruction::new(
            AlarmRinging,
        ))))
    }
}

// ─── The sleeper: waits through two alarms ──────────────────────

struct SleepingProcess {
    core: ProcessCore,
    ctx: Rc<SimulationContext>,
}

impl SleepingProcess {
    fn new(ctx: &Rc<SimulationContext>) -> Rc<RefCell<SleepingProcess>> {
        let process = Rc::new(RefCell::new(SleepingProcess {
            core: ProcessCore::new(ctx),
            ctx: Rc::clone(ctx),
        }));
        ctx.register_process(Rc::clone(&process));
        process
    }
}

impl SimulationElement for SleepingProcess {
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

impl Process for SleepingProcess {
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
        // Explicit resumable state machine: one step per driver resumption.
        struct Night {
            ctx: Rc<SimulationContext>,
            step: u8,
        }

        impl Iterator for Night {
            type Item = skein_engine::InstructionHandle;

            fn next(&mut self) -> Option<Self::Item> {
                self.step += 1;
                let now = self.ctx.time_period();
                match self.step {
                    1 => {
                        println!("going to sleep at period {now}");
                        Some(handle(WaitNotificationInstruction::<AlarmRinging>::new(
                            &self.ctx,
                        )))
                    }
                    2 => {
                        println!("alarm ringing at period {now}, going back to sleep");
                        Some(handle(WaitNotificationInstruction::<AlarmRinging>::new(
                            &self.ctx,
                        )))
                    }
                    3 => {
                        println!("alarm ringing again at period {now}, waking up");
                        Some(handle(RaiseNotificationInstruction::new(Awake)))
                    }
                    _ => None,
                }
            }
        }

        Box::new(Night {
            ctx: Rc::clone(&self.ctx),
            step: 0,
        })
    }
}

// ─── The alarm-setting process ──────────────────────────────────

struct AlarmSettingProcess {
    core: ProcessCore,
}

impl AlarmSettingProcess {
    fn new(ctx: &Rc<SimulationContext>) -> Rc<RefCell<AlarmSettingProcess>> {
        let process = Rc::new(RefCell::new(AlarmSettingProcess {
            core: ProcessCore::new(ctx),
        }));
        ctx.register_process(Rc::clone(&process));
        process
    }
}

impl SimulationElement for AlarmSettingProcess {
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

impl Process for AlarmSettingProcess {
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
        let schedule = |delay: u64| {
            let alarm: ActivityHandle = Rc::new(RefCell::new(AlarmActivity));
            handle(ScheduleActivityInstruction::new(alarm, delay))
        };
        Box::new(vec![schedule(5), schedule(9)].into_iter())
    }
}

fn main() {
    let ctx = SimulationContext::new();
    let _sleeper = SleepingProcess::new(&ctx);
    let _setter = AlarmSettingProcess::new(&ctx);

    let mut simulator = Simulator::new(Rc::clone(&ctx));
    let metrics = simulator.simulate().expect("run completes");

    println!("simulation ended at period {}", ctx.time_period());
    println!(
        "{} instructions completed over {} periods",
        metrics.instructions_completed, metrics.periods_run
    );
}
