//! The driver loop: period-by-period execution to a local fixed point.

use std::rc::Rc;

use skein_core::{SimulationError, TimePeriod};
use tracing::{debug, trace};

use crate::context::SimulationContext;
use crate::metrics::RunMetrics;
use crate::process::ProcessHandle;

/// Drives a simulation context to completion.
///
/// The driver repeatedly services the current period's work queue until no
/// enqueued process can make further progress, then decides whether to
/// advance the clock. Within a period the initial service order follows
/// the queue built by
/// [`move_to_time_period`](SimulationContext::move_to_time_period); a
/// process that completes an instruction re-enters at the back of the
/// queue, so processes interleave strictly through repeated
/// dequeue/requeue cycles. Determinism follows from the fixed comparator
/// and the absence of any other concurrency source.
///
/// # Examples
///
/// ```
/// use skein_engine::{SimulationContext, Simulator};
/// use skein_engine::process::IdleProcess;
///
/// let ctx = SimulationContext::new();
/// let process = IdleProcess::new(&ctx);
/// let mut simulator = Simulator::new(ctx);
/// let metrics = simulator.simulate().unwrap();
/// assert!(process.borrow().state().is_complete());
/// assert_eq!(metrics.processes_completed, 1);
/// ```
pub struct Simulator {
    context: Rc<SimulationContext>,
    end_trigger: Option<Box<dyn Fn() -> bool>>,
    last_metrics: RunMetrics,
}

impl Simulator {
    /// A driver for `context`.
    pub fn new(context: Rc<SimulationContext>) -> Self {
        Self {
            context,
            end_trigger: None,
            last_metrics: RunMetrics::default(),
        }
    }

    /// Install an end trigger, evaluated once per period boundary.
    ///
    /// When the trigger holds at a boundary the run ends without the new
    /// period's queue being processed.
    pub fn set_end_trigger(&mut self, trigger: impl Fn() -> bool + 'static) {
        self.end_trigger = Some(Box::new(trigger));
    }

    /// The context this driver runs.
    pub fn context(&self) -> &Rc<SimulationContext> {
        &self.context
    }

    /// Metrics from the most recent run.
    pub fn last_metrics(&self) -> &RunMetrics {
        &self.last_metrics
    }

    /// Run the simulation to its end condition.
    ///
    /// Begins at period zero. The run ends when the active-process set
    /// empties, a terminate request is observed (immediately, abandoning
    /// the rest of the period), or — at a period boundary, after the clock
    /// has advanced — a stop request or the end trigger holds, in which
    /// case the freshly opened period is never processed.
    pub fn simulate(&mut self) -> Result<RunMetrics, SimulationError> {
        let ctx = Rc::clone(&self.context);
        let mut metrics = RunMetrics::default();

        ctx.move_to_time_period(TimePeriod::ZERO);

        'run: loop {
            metrics.periods_run += 1;

            // Service the current period to its local fixed point. A
            // terminate request aborts mid-period.
            while let Some(process) = ctx.dequeue_process() {
                if ctx.is_simulation_terminating() {
                    break;
                }
                self.service(&ctx, &process, &mut metrics)?;
            }

            trace!(period = %ctx.time_period(), "period reached fixed point");

            // Between periods.
            if ctx.is_simulation_terminating() {
                debug!(period = %ctx.time_period(), "run terminated");
                break 'run;
            }
            if ctx.active_process_count() == 0 {
                debug!(period = %ctx.time_period(), "active process set empty");
                break 'run;
            }

            ctx.move_to_time_period(ctx.time_period().next());

            if ctx.is_simulation_stopping() {
                debug!(period = %ctx.time_period(), "run stopped");
                break 'run;
            }
            if self.end_trigger.as_ref().is_some_and(|trigger| trigger()) {
                debug!(period = %ctx.time_period(), "end trigger fired");
                break 'run;
            }
        }

        metrics.final_period = ctx.time_period();
        self.last_metrics = metrics.clone();
        Ok(metrics)
    }

    /// Give one dequeued process one turn: resume its sequence if nothing
    /// is pending, otherwise evaluate the pending instruction.
    fn service(
        &self,
        ctx: &SimulationContext,
        process: &ProcessHandle,
        metrics: &mut RunMetrics,
    ) -> Result<(), SimulationError> {
        let (index, has_pending) = {
            let p = process.borrow();
            (p.instance_index(), p.state().pending().is_some())
        };

        // A process deactivated after it was queued is skipped; so is one
        // already deferred this period.
        if !ctx.in_active_set(index) || ctx.is_processed(index) {
            return Ok(());
        }

        if !has_pending {
            self.resume(ctx, process, index, metrics);
            return Ok(());
        }

        // Stamp the raise period on first evaluation, and honor a stored
        // recheck hint without polling.
        let now = ctx.time_period();
        let (instruction, raised_in, hint) = {
            let mut p = process.borrow_mut();
            let pending = p
                .state_mut()
                .pending_mut()
                .expect("pending checked above");
            let raised_in = pending.stamp(now);
            (
                Rc::clone(pending.instruction()),
                raised_in,
                pending.recheck_at(),
            )
        };
        if hint.is_some_and(|h| now < h) {
            metrics.polls_skipped += 1;
            ctx.mark_processed(index);
            return Ok(());
        }

        let readiness = instruction
            .borrow_mut()
            .can_complete(ctx, raised_in)
            .map_err(|source| self.instruction_failed(process, source))?;

        if readiness.is_ready() {
            instruction
                .borrow_mut()
                .complete(ctx)
                .map_err(|source| self.instruction_failed(process, source))?;
            metrics.instructions_completed += 1;
            process.borrow_mut().state_mut().clear_pending();
            // Back of the queue: the process may produce and complete
            // further instructions within the same period.
            ctx.enqueue_process(Rc::clone(process));
        } else {
            metrics.instructions_deferred += 1;
            if let Some(pending) = process.borrow_mut().state_mut().pending_mut() {
                pending.set_recheck_at(readiness.recheck_at());
            }
            ctx.mark_processed(index);
        }
        Ok(())
    }

    /// Resume a process's instruction production by one step.
    fn resume(
        &self,
        ctx: &SimulationContext,
        process: &ProcessHandle,
        index: skein_core::InstanceIndex,
        metrics: &mut RunMetrics,
    ) {
        let mut sequence = {
            let mut p = process.borrow_mut();
            match p.state_mut().take_sequence() {
                Some(sequence) => sequence,
                None if !p.state().has_started() => {
                    p.state_mut().mark_started();
                    p.simulate()
                }
                // Started but no stored sequence: the process already
                // completed; nothing to resume.
                None => return,
            }
        };

        // The continuation runs with no kernel borrows held, so process
        // bodies may freely reach the context or their own element.
        let produced = sequence.next();

        let mut p = process.borrow_mut();
        p.state_mut().store_sequence(sequence);
        match produced {
            Some(instruction) => {
                p.state_mut().set_pending(instruction);
                drop(p);
                ctx.enqueue_process(Rc::clone(process));
            }
            None => {
                p.state_mut().mark_complete();
                let key = p.key().clone();
                drop(p);
                ctx.drop_from_active_set(index);
                metrics.processes_completed += 1;
                trace!(process = %key, "process completed");
            }
        }
    }

    fn instruction_failed(
        &self,
        process: &ProcessHandle,
        source: skein_core::InstructionError,
    ) -> SimulationError {
        SimulationError::InstructionFailed {
            process: process.borrow().key().clone(),
            source,
        }
    }
}
