//! Typed event system with pre-allocated ring buffers.
//!
//! Events are emitted while a tick runs (and by direct engine calls between
//! ticks) and delivered in batch during the post-tick phase. Each event type
//! has its own [`EventBuffer`] ring buffer with a configurable capacity.
//!
//! # Subscriber Types
//!
//! - **Passive listeners**: read-only, used for UI updates, audio, analytics.
//! - **Reactive handlers**: return [`Command`]s to enqueue for the next tick.
//!
//! # Suppression
//!
//! Event types can be suppressed via [`EventBus::suppress`], which prevents
//! any allocation or recording for that type. Suppressed events have zero cost.

use crate::command_queue::Command;
use crate::device::GeneratorStatus;
use crate::fixed::{Fixed64, Ticks};
use crate::id::{ActionId, DeviceId, EntityId, ResourceKind};

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// A simulation event. All events carry the tick at which they occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // -- Lifecycle --
    DeviceAdded {
        device: DeviceId,
        tick: Ticks,
    },
    DeviceRemoved {
        device: DeviceId,
        tick: Ticks,
    },

    // -- Insertion --
    InsertionStarted {
        device: DeviceId,
        action: ActionId,
        agent: EntityId,
        item: EntityId,
        delay: Fixed64,
        tick: Ticks,
    },
    InsertionCancelled {
        device: DeviceId,
        action: ActionId,
        tick: Ticks,
    },
    InsertionCommitted {
        device: DeviceId,
        action: ActionId,
        item: EntityId,
        yield_added: Fixed64,
        time_added: Fixed64,
        tick: Ticks,
    },

    // -- Processing --
    ProcessingStarted {
        device: DeviceId,
        tick: Ticks,
    },
    ProcessingHalted {
        device: DeviceId,
        tick: Ticks,
    },
    ResourceEmitted {
        device: DeviceId,
        kind: ResourceKind,
        amount: u32,
        tick: Ticks,
    },

    // -- Device --
    UnanchorVetoed {
        device: DeviceId,
        tick: Ticks,
    },
    StatusChanged {
        device: DeviceId,
        status: GeneratorStatus,
        tick: Ticks,
    },
}

/// Discriminant tag for event types, used for suppression and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    DeviceAdded,
    DeviceRemoved,
    InsertionStarted,
    InsertionCancelled,
    InsertionCommitted,
    ProcessingStarted,
    ProcessingHalted,
    ResourceEmitted,
    UnanchorVetoed,
    StatusChanged,
}

/// Total number of event kinds.
const EVENT_KIND_COUNT: usize = 10;

impl Event {
    /// Get the discriminant kind for this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::DeviceAdded { .. } => EventKind::DeviceAdded,
            Event::DeviceRemoved { .. } => EventKind::DeviceRemoved,
            Event::InsertionStarted { .. } => EventKind::InsertionStarted,
            Event::InsertionCancelled { .. } => EventKind::InsertionCancelled,
            Event::InsertionCommitted { .. } => EventKind::InsertionCommitted,
            Event::ProcessingStarted { .. } => EventKind::ProcessingStarted,
            Event::ProcessingHalted { .. } => EventKind::ProcessingHalted,
            Event::ResourceEmitted { .. } => EventKind::ResourceEmitted,
            Event::UnanchorVetoed { .. } => EventKind::UnanchorVetoed,
            Event::StatusChanged { .. } => EventKind::StatusChanged,
        }
    }

    /// The device this event concerns.
    pub fn device(&self) -> DeviceId {
        match *self {
            Event::DeviceAdded { device, .. }
            | Event::DeviceRemoved { device, .. }
            | Event::InsertionStarted { device, .. }
            | Event::InsertionCancelled { device, .. }
            | Event::InsertionCommitted { device, .. }
            | Event::ProcessingStarted { device, .. }
            | Event::ProcessingHalted { device, .. }
            | Event::ResourceEmitted { device, .. }
            | Event::UnanchorVetoed { device, .. }
            | Event::StatusChanged { device, .. } => device,
        }
    }
}

impl EventKind {
    /// Convert to usize index for array lookups.
    fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// EventBuffer: pre-allocated ring buffer
// ---------------------------------------------------------------------------

/// A pre-allocated ring buffer for events. Fixed capacity; when full, the
/// oldest events are dropped.
#[derive(Debug)]
pub struct EventBuffer {
    events: Vec<Option<Event>>,
    /// Write position (wraps around).
    head: usize,
    len: usize,
    /// Total events ever written (including dropped).
    total_written: u64,
}

impl EventBuffer {
    /// Create a new ring buffer with the given capacity.
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: (0..capacity).map(|_| None).collect(),
            head: 0,
            len: 0,
            total_written: 0,
        }
    }

    /// Push an event into the ring buffer. If full, the oldest event is dropped.
    pub fn push(&mut self, event: Event) {
        self.events[self.head] = Some(event);
        self.head = (self.head + 1) % self.capacity();
        if self.len < self.capacity() {
            self.len += 1;
        }
        self.total_written += 1;
    }

    pub fn capacity(&self) -> usize {
        self.events.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Iterate over events in order from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Event> + '_ {
        // Once full, head is the next write position and thus the oldest slot.
        let start = if self.len < self.capacity() { 0 } else { self.head };
        (0..self.len).filter_map(move |offset| {
            self.events[(start + offset) % self.capacity()].as_ref()
        })
    }

    pub fn clear(&mut self) {
        for slot in &mut self.events {
            *slot = None;
        }
        self.head = 0;
        self.len = 0;
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// A passive listener receives events read-only.
pub type PassiveListener = Box<dyn FnMut(&Event)>;

/// A reactive handler receives an event and returns zero or more commands
/// to enqueue for the next tick.
pub type ReactiveHandler = Box<dyn FnMut(&Event) -> Vec<Command>>;

/// Optional predicate that filters events for a subscriber.
pub type EventFilter = Box<dyn Fn(&Event) -> bool>;

enum Subscriber {
    Passive(PassiveListener),
    Reactive(ReactiveHandler),
}

/// Priority level for event subscribers. Lower priorities run first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SubscriberPriority {
    Pre = 0,
    Normal = 1,
    Post = 2,
}

struct SubscriberEntry {
    subscriber: Subscriber,
    priority: SubscriberPriority,
    filter: Option<EventFilter>,
    insertion_order: u64,
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// The central event bus. Holds one ring buffer per event kind, subscriber
/// lists, and suppression flags.
pub struct EventBus {
    buffers: [Option<EventBuffer>; EVENT_KIND_COUNT],
    suppressed: [bool; EVENT_KIND_COUNT],
    subscribers: [Vec<SubscriberEntry>; EVENT_KIND_COUNT],
    /// Commands collected from reactive handlers during delivery. Drained by
    /// the engine at the start of the next tick.
    pending_commands: Vec<Command>,
    default_capacity: usize,
    next_insertion_order: u64,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("buffers", &self.buffers)
            .field("suppressed", &self.suppressed)
            .field("pending_commands", &self.pending_commands)
            .field("default_capacity", &self.default_capacity)
            .finish_non_exhaustive()
    }
}

impl EventBus {
    /// Create a new event bus with the given default buffer capacity per type.
    pub fn new(default_capacity: usize) -> Self {
        Self {
            buffers: Default::default(),
            suppressed: [false; EVENT_KIND_COUNT],
            subscribers: Default::default(),
            pending_commands: Vec::new(),
            default_capacity,
            next_insertion_order: 0,
        }
    }

    /// Suppress an event kind. Suppressed events are never allocated or buffered.
    pub fn suppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = true;
        self.buffers[kind.index()] = None;
    }

    pub fn is_suppressed(&self, kind: EventKind) -> bool {
        self.suppressed[kind.index()]
    }

    /// Buffer an event for delivery. No-ops if the event kind is suppressed.
    pub fn emit(&mut self, event: Event) {
        let idx = event.kind().index();
        if self.suppressed[idx] {
            return;
        }
        let capacity = self.default_capacity;
        self.buffers[idx]
            .get_or_insert_with(|| EventBuffer::new(capacity))
            .push(event);
    }

    /// Register a passive listener with Normal priority and no filter.
    pub fn on_passive(&mut self, kind: EventKind, listener: PassiveListener) {
        self.on_passive_filtered(kind, SubscriberPriority::Normal, None, listener);
    }

    /// Register a reactive handler with Normal priority and no filter.
    pub fn on_reactive(&mut self, kind: EventKind, handler: ReactiveHandler) {
        self.on_reactive_filtered(kind, SubscriberPriority::Normal, None, handler);
    }

    pub fn on_passive_filtered(
        &mut self,
        kind: EventKind,
        priority: SubscriberPriority,
        filter: Option<EventFilter>,
        listener: PassiveListener,
    ) {
        self.subscribe(kind, priority, filter, Subscriber::Passive(listener));
    }

    pub fn on_reactive_filtered(
        &mut self,
        kind: EventKind,
        priority: SubscriberPriority,
        filter: Option<EventFilter>,
        handler: ReactiveHandler,
    ) {
        self.subscribe(kind, priority, filter, Subscriber::Reactive(handler));
    }

    fn subscribe(
        &mut self,
        kind: EventKind,
        priority: SubscriberPriority,
        filter: Option<EventFilter>,
        subscriber: Subscriber,
    ) {
        let order = self.next_insertion_order;
        self.next_insertion_order += 1;
        let list = &mut self.subscribers[kind.index()];
        list.push(SubscriberEntry {
            subscriber,
            priority,
            filter,
            insertion_order: order,
        });
        list.sort_by_key(|entry| (entry.priority, entry.insertion_order));
    }

    /// Deliver all buffered events to subscribers, then clear the buffers.
    ///
    /// Within a kind, each subscriber (in priority order) sees every event
    /// oldest-to-newest. Reactive handler commands accumulate until
    /// [`EventBus::drain_commands`] is called.
    pub fn deliver(&mut self) {
        for idx in 0..EVENT_KIND_COUNT {
            let Some(buffer) = self.buffers[idx].as_mut() else {
                continue;
            };
            if buffer.is_empty() {
                continue;
            }
            let events: Vec<Event> = buffer.iter().cloned().collect();
            buffer.clear();

            for entry in &mut self.subscribers[idx] {
                for event in &events {
                    if let Some(ref filter) = entry.filter
                        && !filter(event)
                    {
                        continue;
                    }
                    match &mut entry.subscriber {
                        Subscriber::Passive(listener) => listener(event),
                        Subscriber::Reactive(handler) => {
                            let commands = handler(event);
                            self.pending_commands.extend(commands);
                        }
                    }
                }
            }
        }
    }

    /// Drain commands produced by reactive handlers.
    pub fn drain_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.pending_commands)
    }

    pub fn buffer(&self, kind: EventKind) -> Option<&EventBuffer> {
        self.buffers[kind.index()].as_ref()
    }

    /// Events of `kind` currently waiting for delivery.
    pub fn buffered_count(&self, kind: EventKind) -> usize {
        self.buffers[kind.index()]
            .as_ref()
            .map_or(0, EventBuffer::len)
    }

    /// Total events ever emitted for a kind (including dropped).
    pub fn total_emitted(&self, kind: EventKind) -> u64 {
        self.buffers[kind.index()]
            .as_ref()
            .map_or(0, EventBuffer::total_written)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Subscriber::Passive(_) => write!(f, "Passive(<fn>)"),
            Subscriber::Reactive(_) => write!(f, "Reactive(<fn>)"),
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
