//! The coordinator between the pipeline, the timeline, the viewers and the
//! host surfaces.

mod mediator;
pub mod mock;
mod scheduler;

pub use mediator::{Component, Mediator, MediatorComponents};
pub use scheduler::{scheduler_for_delay, FlushDelay, PresentationScheduler, TokioYield};
