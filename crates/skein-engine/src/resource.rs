//! Capacity-bounded resources.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use skein_core::{Capability, ElementKey};
use smallvec::SmallVec;

use crate::context::SimulationContext;
use crate::element::SimulationElement;

/// A capacity-bounded counter element.
///
/// `capacity` is fixed at construction; `allocated` satisfies
/// `0 <= allocated <= capacity` at every observation point between
/// allocation and release completions, and is mutated only by the
/// completion effects of the allocate/release instructions.
///
/// The `kind` capability groups resources into an allocatable class: an
/// allocation for that kind may be satisfied across any resources
/// registered under it.
///
/// # Examples
///
/// ```
/// use skein_core::Capability;
/// use skein_engine::{Resource, SimulationContext};
///
/// const CREW: Capability = Capability::user(0);
///
/// let ctx = SimulationContext::new();
/// let crew = Resource::new(&ctx, CREW, 4);
/// assert_eq!(crew.borrow().capacity(), 4);
/// assert_eq!(crew.borrow().allocated(), 0);
/// assert_eq!(crew.borrow().spare(), 4);
/// ```
pub struct Resource {
    key: ElementKey,
    kind: Capability,
    capabilities: SmallVec<[Capability; 4]>,
    capacity: u32,
    allocated: u32,
}

impl Resource {
    /// Construct and register a resource with a fresh auto key.
    pub fn new(
        ctx: &SimulationContext,
        kind: Capability,
        capacity: u32,
    ) -> Rc<RefCell<Resource>> {
        Self::build(ctx, ctx.auto_key(), kind, capacity)
    }

    /// Construct and register a resource under a caller-supplied key.
    pub fn with_key(
        ctx: &SimulationContext,
        key: impl Into<ElementKey>,
        kind: Capability,
        capacity: u32,
    ) -> Rc<RefCell<Resource>> {
        Self::build(ctx, key.into(), kind, capacity)
    }

    fn build(
        ctx: &SimulationContext,
        key: ElementKey,
        kind: Capability,
        capacity: u32,
    ) -> Rc<RefCell<Resource>> {
        let mut capabilities: SmallVec<[Capability; 4]> =
            SmallVec::from_slice(&[Capability::ELEMENT, Capability::RESOURCE]);
        if kind != Capability::RESOURCE {
            capabilities.push(kind);
        }
        let resource = Rc::new(RefCell::new(Resource {
            key,
            kind,
            capabilities,
            capacity,
            allocated: 0,
        }));
        ctx.register(Rc::clone(&resource));
        resource
    }

    /// The allocatable class this resource belongs to.
    pub fn kind(&self) -> Capability {
        self.kind
    }

    /// Total quantity that can be allocated.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Quantity currently allocated.
    pub fn allocated(&self) -> u32 {
        self.allocated
    }

    /// Quantity still available for allocation.
    pub fn spare(&self) -> u32 {
        self.capacity - self.allocated
    }

    /// Take `amount` out of the spare capacity.
    ///
    /// Callers must have checked `amount <= spare()`; the allocate
    /// instruction does so before recording any grant.
    pub fn allocate(&mut self, amount: u32) {
        debug_assert!(amount <= self.spare());
        self.allocated += amount;
    }

    /// Return a previously granted `amount` to the spare capacity.
    pub fn release(&mut self, amount: u32) {
        debug_assert!(amount <= self.allocated);
        self.allocated -= amount;
    }
}

impl SimulationElement for Resource {
    fn key(&self) -> &ElementKey {
        &self.key
    }

    fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn as_resource(&self) -> Option<&Resource> {
        Some(self)
    }

    fn as_resource_mut(&mut self) -> Option<&mut Resource> {
        Some(self)
    }
}
