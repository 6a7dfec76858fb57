//! Notification raise and await instructions.

use std::any::Any;
use std::rc::Rc;

use skein_core::{InstructionError, Readiness, TimePeriod};

use crate::context::SimulationContext;
use crate::instruction::Instruction;
use crate::notification::WaiterSlot;

/// Hold the issuing process until a matching notification is raised.
///
/// Construction registers the waiter with the context's notification hub;
/// from then until completion, every matching raise appends its payload to
/// this instruction's buffer. The poll is ready once the buffer holds at
/// least one entry; completion consumes nothing — the buffered payloads
/// stay available to the issuing process through
/// [`notifications`](Self::notifications) /
/// [`take_notifications`](Self::take_notifications).
pub struct WaitNotificationInstruction<T: 'static> {
    slot: Rc<WaiterSlot<T>>,
}

impl<T: 'static> WaitNotificationInstruction<T> {
    /// Wait for any notification of type `T`.
    pub fn new(ctx: &SimulationContext) -> Self {
        Self::build(ctx, None)
    }

    /// Wait for a notification of type `T` accepted by `predicate`.
    pub fn with_predicate(
        ctx: &SimulationContext,
        predicate: impl Fn(&T) -> bool + 'static,
    ) -> Self {
        Self::build(ctx, Some(Box::new(predicate) as Box<dyn Fn(&T) -> bool>))
    }

    fn build(ctx: &SimulationContext, predicate: Option<Box<dyn Fn(&T) -> bool>>) -> Self {
        let slot = WaiterSlot::new(predicate);
        ctx.notifications().register(&slot);
        Self { slot }
    }

    /// The notifications delivered so far.
    pub fn notifications(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.slot.clone_buffer()
    }

    /// Drain the delivered notifications out of the buffer.
    pub fn take_notifications(&self) -> Vec<T> {
        self.slot.drain()
    }
}

impl<T: 'static> Instruction for WaitNotificationInstruction<T> {
    fn can_complete(
        &mut self,
        _ctx: &SimulationContext,
        _raised_in: TimePeriod,
    ) -> Result<Readiness, InstructionError> {
        if self.slot.len() > 0 {
            Ok(Readiness::Ready)
        } else {
            Ok(Readiness::blocked())
        }
    }

    fn complete(&mut self, _ctx: &SimulationContext) -> Result<(), InstructionError> {
        self.slot.mark_done();
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Broadcast a notification payload.
///
/// Always ready; completion delivers the payload to every outstanding
/// waiter of the same type in the same context whose predicate (if any)
/// accepts it. A raise that matches no waiter is discarded — it is never
/// retroactively visible to waiters constructed later.
pub struct RaiseNotificationInstruction<T: Clone + 'static> {
    notification: T,
}

impl<T: Clone + 'static> RaiseNotificationInstruction<T> {
    /// Raise `notification` on completion.
    pub fn new(notification: T) -> Self {
        Self { notification }
    }

    /// The payload this instruction raises.
    pub fn notification(&self) -> &T {
        &self.notification
    }
}

impl<T: Clone + 'static> Instruction for RaiseNotificationInstruction<T> {
    fn can_complete(
        &mut self,
        _ctx: &SimulationContext,
        _raised_in: TimePeriod,
    ) -> Result<Readiness, InstructionError> {
        Ok(Readiness::Ready)
    }

    fn complete(&mut self, ctx: &SimulationContext) -> Result<(), InstructionError> {
        ctx.notifications().deliver(&self.notification);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
