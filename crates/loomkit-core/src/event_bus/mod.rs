//! # Event Bus Module
//!
//! A single notification channel per compositing session. Layer-dirty,
//! composition-complete and frame-ready signals all travel through it, so
//! their relative order is the publish order.
//!
//! ## Usage
//!
//! ```rust
//! use loomkit_core::event_bus::{CompositionEvent, EventBus, EventCategory, EventFilter, SessionEvent};
//!
//! let bus = EventBus::new();
//! let subscription = bus.subscribe(
//!     EventFilter::Categories(vec![EventCategory::Composition]),
//!     |event| {
//!         if let SessionEvent::Composition(CompositionEvent::FrameReady { frame }) = event {
//!             println!("frame {} ready", frame);
//!         }
//!     },
//! );
//!
//! bus.emit(SessionEvent::Composition(CompositionEvent::FrameReady { frame: 1 }));
//! bus.unsubscribe(subscription);
//! ```

mod bus;
mod events;

pub use bus::*;
pub use events::*;
