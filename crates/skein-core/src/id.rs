//! Strongly-typed identifiers for simulation elements and time.

use std::fmt;

/// A discrete tick of simulated time.
///
/// The kernel advances the period only when no enqueued process can make
/// further progress within the current one; many instruction completions
/// may therefore occur inside a single period.
///
/// # Examples
///
/// ```
/// use skein_core::TimePeriod;
///
/// let raised = TimePeriod(3);
/// assert_eq!(raised.plus(4), TimePeriod(7));
/// assert_eq!(raised.next(), TimePeriod(4));
/// assert!(raised < raised.next());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimePeriod(pub u64);

impl TimePeriod {
    /// The period a fresh context starts in.
    pub const ZERO: TimePeriod = TimePeriod(0);

    /// The period `periods` ticks after this one.
    pub fn plus(self, periods: u64) -> TimePeriod {
        TimePeriod(self.0 + periods)
    }

    /// The immediately following period.
    pub fn next(self) -> TimePeriod {
        self.plus(1)
    }
}

impl fmt::Display for TimePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TimePeriod {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Monotonic per-context process index.
///
/// Assigned once per process at construction from a counter owned by the
/// simulation context, so independently constructed simulation runs never
/// leak sequence state into each other. Used as the final tie-break when
/// ordering the per-period work queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceIndex(pub u64);

impl fmt::Display for InstanceIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for InstanceIndex {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Identity of a registered simulation element.
///
/// Unique within each capability bucket it is registered under;
/// re-registering an existing key overwrites the prior entry. Elements
/// constructed without an explicit key receive a fresh [`Auto`] value from
/// their context.
///
/// [`Auto`]: ElementKey::Auto
///
/// # Examples
///
/// ```
/// use skein_core::ElementKey;
///
/// let named = ElementKey::from("lathe-2");
/// assert_eq!(named.to_string(), "lathe-2");
/// assert_eq!(ElementKey::Auto(7).to_string(), "#7");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ElementKey {
    /// Context-assigned fresh identity.
    Auto(u64),
    /// Caller-supplied name.
    Name(String),
}

impl fmt::Display for ElementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto(n) => write!(f, "#{n}"),
            Self::Name(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for ElementKey {
    fn from(s: &str) -> Self {
        Self::Name(s.to_string())
    }
}

impl From<String> for ElementKey {
    fn from(s: String) -> Self {
        Self::Name(s)
    }
}

/// A kind tag satisfied by a simulation element.
///
/// Capabilities replace run-time type lineage: each concrete element
/// declares every tag it satisfies, the registry indexes elements under
/// each declared tag, and a "query by supertype" becomes a query by tag.
/// A resource class (the target of an allocation) is simply a user
/// capability shared by the resources of that class.
///
/// Values below [`Capability::USER_BASE`] are reserved for the kernel.
///
/// # Examples
///
/// ```
/// use skein_core::Capability;
///
/// const REPAIR_CREW: Capability = Capability::user(0);
/// assert_ne!(REPAIR_CREW, Capability::RESOURCE);
/// assert_eq!(REPAIR_CREW, Capability(16));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Capability(pub u32);

impl Capability {
    /// Satisfied by every registered element.
    pub const ELEMENT: Capability = Capability(0);
    /// Satisfied by every capacity-bounded resource.
    pub const RESOURCE: Capability = Capability(1);
    /// Satisfied by every schedulable process.
    pub const PROCESS: Capability = Capability(2);

    /// First tag value free for user-defined kinds.
    pub const USER_BASE: u32 = 16;

    /// The `n`-th user-defined kind tag.
    pub const fn user(n: u32) -> Capability {
        Capability(Self::USER_BASE + n)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::ELEMENT => write!(f, "element"),
            Self::RESOURCE => write!(f, "resource"),
            Self::PROCESS => write!(f, "process"),
            Capability(n) => write!(f, "{n}"),
        }
    }
}
