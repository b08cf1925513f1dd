//! ICS export of the approved calendar events.

mod generate;
mod publish;

pub use generate::generate_calendar;
pub use publish::IcsPublisher;
