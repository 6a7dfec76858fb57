//! The [`SimulationElement`] trait: identity plus capability tags.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use skein_core::{Capability, ElementKey};

use crate::process::Process;
use crate::resource::Resource;

/// Shared handle to a registered element.
///
/// The kernel is single-threaded and cooperative; elements are shared
/// through `Rc<RefCell<..>>` and mutated only inside instruction completion
/// effects executed by the driver.
pub type ElementHandle = Rc<RefCell<dyn SimulationElement>>;

/// An entity registered with a simulation context.
///
/// An element has an identity [`ElementKey`] and declares the set of
/// [`Capability`] tags it satisfies; the registry indexes it under every
/// declared tag. Elements are registered exactly once, at construction, and
/// never deregistered — the context is their sole long-lived owner.
///
/// Implementors expose narrower views through the `as_*` hooks so kernel
/// machinery can reach the concrete role without downcasting: a
/// capacity-bounded resource overrides [`as_resource`], arbitrary user
/// state is reachable through [`as_any`].
///
/// [`as_resource`]: SimulationElement::as_resource
/// [`as_any`]: SimulationElement::as_any
pub trait SimulationElement: 'static {
    /// The identity this element is registered under.
    fn key(&self) -> &ElementKey;

    /// Every capability tag this element satisfies.
    fn capabilities(&self) -> &[Capability];

    /// This element as `Any`, for user-side downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Mutable `Any` view.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// The resource view, if this element is a resource.
    fn as_resource(&self) -> Option<&Resource> {
        None
    }

    /// Mutable resource view, if this element is a resource.
    fn as_resource_mut(&mut self) -> Option<&mut Resource> {
        None
    }

    /// The process view, if this element is a process.
    fn as_process(&self) -> Option<&dyn Process> {
        None
    }
}
