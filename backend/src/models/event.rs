//! Event log of trades, inventions and removals
//!
//! Events are only kept when `record_events` is enabled; the log is then an
//! in-memory trace that tests and the CLI can query by day or type.
//!
//! # Example
//!
//! ```rust
//! use societies_core::models::{Event, EventLog};
//! use societies_core::DeviceKind;
//!
//! let mut log = EventLog::new(true);
//! log.log(Event::DeviceInvented {
//!     day: 3,
//!     inventor: 1,
//!     kind: DeviceKind::Tool,
//!     resource: 4,
//!     components: vec![0, 2, 5],
//! });
//!
//! assert_eq!(log.events_for_day(3).len(), 1);
//! assert_eq!(log.events_of_type("DeviceInvented").len(), 1);
//! ```

use crate::devices::DeviceKind;
use serde::{Deserialize, Serialize};

/// Simulation event capturing a state change
///
/// Every event carries the day it happened on. Events are logged in the
/// order they occur within a day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// Two agents swapped resources
    ResourceTrade {
        day: usize,
        agent_a: usize,
        agent_b: usize,
        /// Resource `agent_a` received
        a_received: usize,
        a_received_units: i64,
        /// Resource `agent_a` gave up
        a_gave: usize,
        a_gave_units: i64,
    },

    /// A device changed hands for a bundle of resources
    DeviceTrade {
        day: usize,
        buyer: usize,
        seller: usize,
        kind: DeviceKind,
        resource: usize,
        /// Units of each resource paid by the buyer
        bundle: Vec<i64>,
        buyer_surplus: f64,
        seller_surplus: f64,
    },

    /// A device definition was created or replaced
    DeviceInvented {
        day: usize,
        inventor: usize,
        kind: DeviceKind,
        resource: usize,
        components: Vec<usize>,
    },

    AgentRemoved {
        day: usize,
        agent: usize,
    },

    ResourceRemoved {
        day: usize,
        resource: usize,
        eliminate_holdings: bool,
    },
}

impl Event {
    pub fn day(&self) -> usize {
        match self {
            Event::ResourceTrade { day, .. }
            | Event::DeviceTrade { day, .. }
            | Event::DeviceInvented { day, .. }
            | Event::AgentRemoved { day, .. }
            | Event::ResourceRemoved { day, .. } => *day,
        }
    }

    /// Short name of the variant
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::ResourceTrade { .. } => "ResourceTrade",
            Event::DeviceTrade { .. } => "DeviceTrade",
            Event::DeviceInvented { .. } => "DeviceInvented",
            Event::AgentRemoved { .. } => "AgentRemoved",
            Event::ResourceRemoved { .. } => "ResourceRemoved",
        }
    }

    /// Whether the event involves `agent`
    pub fn involves_agent(&self, agent: usize) -> bool {
        match self {
            Event::ResourceTrade {
                agent_a, agent_b, ..
            } => *agent_a == agent || *agent_b == agent,
            Event::DeviceTrade { buyer, seller, .. } => *buyer == agent || *seller == agent,
            Event::DeviceInvented { inventor, .. } => *inventor == agent,
            Event::AgentRemoved { agent: removed, .. } => *removed == agent,
            Event::ResourceRemoved { .. } => false,
        }
    }
}

/// Event log for storing and querying simulation events
///
/// A disabled log drops everything passed to [`EventLog::log`].
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    enabled: bool,
    events: Vec<Event>,
}

impl EventLog {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            events: Vec::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Add an event to the log (no-op when disabled)
    pub fn log(&mut self, event: Event) {
        if self.enabled {
            self.events.push(event);
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn events_for_day(&self, day: usize) -> Vec<&Event> {
        self.events.iter().filter(|e| e.day() == day).collect()
    }

    pub fn events_of_type(&self, event_type: &str) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    pub fn events_for_agent(&self, agent: usize) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.involves_agent(agent))
            .collect()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
