//! Scheduled publishing for lessonflow
//!
//! A [`Publisher`] runs *ticks*. Each tick finds lessons whose `publish_at`
//! has passed while still `scheduled`, publishes every one of them in its own
//! transaction and cascades publication to the owning program the first time
//! one of its lessons goes live.
//!
//! Ticks are safe to run concurrently from any number of processes:
//! - a lesson row is claimed without waiting (`SKIP LOCKED` where the backend
//!   supports it) and the status change is a compare-and-swap, so a lesson
//!   handled elsewhere is counted as *skipped*, never published twice
//! - a failing lesson rolls back alone and stays `scheduled` for the next tick
//! - a second tick over an unchanged store is a no-op
//!
//! The administrative API publishes lessons by hand through the same
//! [`transition`] functions, so both paths have the same effect on programs.

pub mod clock;
pub mod engine;
pub mod error;
pub mod health;
pub mod transition;
pub mod worker;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{LessonOutcome, Publisher, TickSummary};
pub use error::PublishError;
pub use health::{WorkerHealth, WorkerHealthSnapshot};
pub use transition::{publish_now, validate_publishable, ManualPublish};
pub use worker::{run_worker, DEFAULT_TICK_INTERVAL};
