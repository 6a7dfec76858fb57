//! The simulation context: registry, clock, active-process bookkeeping,
//! and notification hub.

use std::cell::{Cell, Ref, RefCell};
use std::collections::{HashSet, VecDeque};
use std::rc::Rc;

use indexmap::IndexMap;
use skein_core::{Capability, ElementKey, InstanceIndex, Priority, TimePeriod};
use tracing::{debug, trace};

use crate::element::{ElementHandle, SimulationElement};
use crate::notification::NotificationHub;
use crate::process::{Process, ProcessHandle};
use crate::registry::ElementRegistry;

/// State shared by every element of one simulation run.
///
/// The context owns the element registry, the discrete period clock, the
/// active-process set and per-period work queue, the one-way stop and
/// terminate flags, and the notification hub. Execution is single-threaded
/// and cooperative, so all fields use interior mutability and the context
/// is shared as `Rc<SimulationContext>`; instructions receive it as
/// `&SimulationContext`.
///
/// # Examples
///
/// ```
/// use skein_core::TimePeriod;
/// use skein_engine::SimulationContext;
///
/// let ctx = SimulationContext::new();
/// assert_eq!(ctx.time_period(), TimePeriod(0));
/// assert!(!ctx.is_simulation_stopping());
/// ```
pub struct SimulationContext {
    time_period: Cell<TimePeriod>,
    stopping: Cell<bool>,
    terminating: Cell<bool>,
    registry: RefCell<ElementRegistry>,
    processes: RefCell<IndexMap<InstanceIndex, ProcessHandle>>,
    active: RefCell<Option<IndexMap<InstanceIndex, ProcessHandle>>>,
    work_queue: RefCell<VecDeque<ProcessHandle>>,
    processed: RefCell<HashSet<InstanceIndex>>,
    notifications: NotificationHub,
    next_key: Cell<u64>,
    next_instance: Cell<u64>,
}

impl SimulationContext {
    /// Create a fresh context at period zero.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Rc<SimulationContext> {
        Rc::new(SimulationContext {
            time_period: Cell::new(TimePeriod::ZERO),
            stopping: Cell::new(false),
            terminating: Cell::new(false),
            registry: RefCell::new(ElementRegistry::new()),
            processes: RefCell::new(IndexMap::new()),
            active: RefCell::new(None),
            work_queue: RefCell::new(VecDeque::new()),
            processed: RefCell::new(HashSet::new()),
            notifications: NotificationHub::default(),
            next_key: Cell::new(0),
            next_instance: Cell::new(0),
        })
    }

    // ── Identity allocation ──────────────────────────────────────

    /// A fresh auto element key, unique within this context.
    pub fn auto_key(&self) -> ElementKey {
        let n = self.next_key.get();
        self.next_key.set(n + 1);
        ElementKey::Auto(n)
    }

    /// The next monotonic process instance index.
    ///
    /// Owned per context so independently constructed runs never share
    /// sequence state.
    pub fn allocate_instance_index(&self) -> InstanceIndex {
        let n = self.next_instance.get();
        self.next_instance.set(n + 1);
        InstanceIndex(n)
    }

    // ── Registration and queries ─────────────────────────────────

    /// Register an element under every capability it declares.
    ///
    /// Elements register exactly once, at construction; re-registering an
    /// existing key overwrites the prior entry. Processes go through
    /// [`register_process`](Self::register_process) instead so they also
    /// enter the scheduling table.
    pub fn register<E: SimulationElement>(&self, element: Rc<RefCell<E>>) {
        self.registry.borrow_mut().register(element);
    }

    /// Register a process: element registration plus the scheduling table.
    pub fn register_process<P: Process>(&self, process: Rc<RefCell<P>>) {
        let index = process.borrow().instance_index();
        self.registry.borrow_mut().register(Rc::clone(&process) as ElementHandle);
        self.processes.borrow_mut().insert(index, process);
    }

    /// Read access to the element registry.
    pub fn registry(&self) -> Ref<'_, ElementRegistry> {
        self.registry.borrow()
    }

    /// Look up one element by capability bucket and key.
    pub fn get_by_key(&self, capability: Capability, key: &ElementKey) -> Option<ElementHandle> {
        self.registry.borrow().get_by_key(capability, key)
    }

    /// All elements declaring `capability`, in registration order.
    pub fn get_by_capability(&self, capability: Capability) -> Vec<ElementHandle> {
        self.registry.borrow().get_by_capability(capability)
    }

    // ── Clock and run flags ──────────────────────────────────────

    /// The current discrete time period.
    pub fn time_period(&self) -> TimePeriod {
        self.time_period.get()
    }

    /// Whether a stop has been requested. One-way; never resets.
    pub fn is_simulation_stopping(&self) -> bool {
        self.stopping.get()
    }

    /// Whether a terminate has been requested. One-way; never resets.
    pub fn is_simulation_terminating(&self) -> bool {
        self.terminating.get()
    }

    /// Request a stop at the next period boundary. Idempotent.
    pub fn request_stop(&self) {
        if !self.stopping.replace(true) {
            debug!(period = %self.time_period(), "simulation stop requested");
        }
    }

    /// Request termination without finishing the current period. Idempotent.
    pub fn request_terminate(&self) {
        if !self.terminating.replace(true) {
            debug!(period = %self.time_period(), "simulation terminate requested");
        }
    }

    // ── Active-process bookkeeping ───────────────────────────────

    /// Move the clock to `period` and rebuild the period's work queue.
    ///
    /// The very first call snapshots every registered process whose state
    /// is active into the active set; afterwards the set is maintained
    /// incrementally by [`activate`](Self::activate) /
    /// [`deactivate`](Self::deactivate) and by process completion, never
    /// re-snapshotted. The queue is rebuilt by stable-sorting the active
    /// set ascending on (process priority, pending-instruction priority
    /// (`Medium` if none), pending raise period (current period if none),
    /// instance index). The processed-this-period set is cleared.
    pub fn move_to_time_period(&self, period: TimePeriod) {
        self.time_period.set(period);

        if self.active.borrow().is_none() {
            let mut snapshot = IndexMap::new();
            for (index, handle) in self.processes.borrow().iter() {
                if handle.borrow().state().is_active() {
                    snapshot.insert(*index, Rc::clone(handle));
                }
            }
            *self.active.borrow_mut() = Some(snapshot);
        }

        let mut ordered: Vec<((Priority, Priority, TimePeriod, InstanceIndex), ProcessHandle)> =
            Vec::new();
        {
            let active = self.active.borrow();
            let active = active.as_ref().expect("active set snapshotted above");
            ordered.reserve(active.len());
            for handle in active.values() {
                let process = handle.borrow();
                let (instruction_priority, raised_in) = match process.state().pending() {
                    Some(pending) => (
                        pending.instruction().borrow().priority(),
                        pending.raised_in().unwrap_or(period),
                    ),
                    None => (Priority::Medium, period),
                };
                ordered.push((
                    (
                        process.priority(),
                        instruction_priority,
                        raised_in,
                        process.instance_index(),
                    ),
                    Rc::clone(handle),
                ));
            }
        }
        ordered.sort_by(|a, b| a.0.cmp(&b.0));

        let mut queue = self.work_queue.borrow_mut();
        queue.clear();
        queue.extend(ordered.into_iter().map(|(_, handle)| handle));
        self.processed.borrow_mut().clear();

        trace!(period = %period, queued = queue.len(), "moved to time period");
    }

    /// Mark `process` active and add it to the active set.
    ///
    /// Before the first [`move_to_time_period`](Self::move_to_time_period)
    /// only the flag is set; the initial snapshot picks the process up.
    /// The process joins the work queue at the next period rebuild.
    pub fn activate(&self, process: &ProcessHandle) {
        let index = {
            let mut p = process.borrow_mut();
            p.state_mut().set_active(true);
            p.instance_index()
        };
        if let Some(active) = self.active.borrow_mut().as_mut() {
            active.entry(index).or_insert_with(|| Rc::clone(process));
        }
    }

    /// Mark `process` inactive and remove it from the active set.
    ///
    /// The process is not unwound; resources it holds stay held until an
    /// explicit release.
    pub fn deactivate(&self, process: &ProcessHandle) {
        let index = {
            let mut p = process.borrow_mut();
            p.state_mut().set_active(false);
            p.instance_index()
        };
        if let Some(active) = self.active.borrow_mut().as_mut() {
            active.shift_remove(&index);
        }
    }

    /// Number of processes currently in the active set.
    ///
    /// Zero before the first period rebuild takes the initial snapshot.
    pub fn active_process_count(&self) -> usize {
        self.active.borrow().as_ref().map_or(0, IndexMap::len)
    }

    /// The processes currently in the active set.
    pub fn active_processes(&self) -> Vec<ProcessHandle> {
        self.active
            .borrow()
            .as_ref()
            .map(|active| active.values().map(Rc::clone).collect())
            .unwrap_or_default()
    }

    /// The notification hub scoped to this context.
    pub fn notifications(&self) -> &NotificationHub {
        &self.notifications
    }

    // ── Driver plumbing ──────────────────────────────────────────

    pub(crate) fn dequeue_process(&self) -> Option<ProcessHandle> {
        self.work_queue.borrow_mut().pop_front()
    }

    pub(crate) fn enqueue_process(&self, process: ProcessHandle) {
        self.work_queue.borrow_mut().push_back(process);
    }

    pub(crate) fn mark_processed(&self, index: InstanceIndex) {
        self.processed.borrow_mut().insert(index);
    }

    pub(crate) fn is_processed(&self, index: InstanceIndex) -> bool {
        self.processed.borrow().contains(&index)
    }

    pub(crate) fn in_active_set(&self, index: InstanceIndex) -> bool {
        self.active
            .borrow()
            .as_ref()
            .is_some_and(|active| active.contains_key(&index))
    }

    pub(crate) fn drop_from_active_set(&self, index: InstanceIndex) {
        if let Some(active) = self.active.borrow_mut().as_mut() {
            active.shift_remove(&index);
        }
    }
}
