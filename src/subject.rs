//! Subjects: publishers that values are pushed into by hand.
//!
//! Both subjects are also subscribers, so a subject subscribed to a
//! publisher multicasts it to everything attached to the subject.

mod behavior_subject;
mod hub;
mod publish_subject;

pub use behavior_subject::BehaviorSubject;
pub use publish_subject::PublishSubject;
