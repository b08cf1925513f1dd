//! Calendar document generation.

use chrono::{DateTime, Duration, Utc};
use icalendar::{Calendar, Component, EventLike, Property, ValueType};

use crate::calendar::EventComplete;
use crate::recurrence::normalize_rule;

/// Build the calendar document for `events`.
///
/// `dtstamp` is written on every component so that output only depends on the inputs.
pub fn generate_calendar(events: &[EventComplete], domain: &str, dtstamp: DateTime<Utc>) -> String {
    let mut cal = Calendar::new();
    let dtstamp = dtstamp.format("%Y%m%dT%H%M%SZ").to_string();

    for complete in events {
        let event = &complete.event;
        let mut ics_event = icalendar::Event::new();

        ics_event.uid(&format!("{}@{}", event.id, domain));
        ics_event.summary(&event.name);
        ics_event.add_property("DTSTAMP", &dtstamp);
        ics_event.add_property("CLASS", "PUBLIC");

        if event.all_day {
            // DTEND is exclusive for dates, so the last day is included
            let start = event.start.date_naive();
            let end = event.end.date_naive().max(start) + Duration::days(1);
            add_date_property(&mut ics_event, "DTSTART", start.format("%Y%m%d").to_string());
            add_date_property(&mut ics_event, "DTEND", end.format("%Y%m%d").to_string());
        } else {
            ics_event.add_property("DTSTART", event.start.format("%Y%m%dT%H%M%SZ").to_string());
            ics_event.add_property("DTEND", event.end.format("%Y%m%dT%H%M%SZ").to_string());
        }

        if let Some(ref desc) = event.description {
            ics_event.description(desc);
        }
        ics_event.location(&event.location);
        ics_event.append_property(Property::new("ORGANIZER", &complete.association.name));

        if let Some(ref rule) = event.recurrence_rule {
            let rule = normalize_rule(rule);
            if !rule.is_empty() {
                ics_event.add_property("RRULE", &rule);
            }
        }

        cal.push(ics_event.done());
    }

    strip_ics_bloat(&cal.done().to_string(), domain)
}

/// - Replace PRODID with the application domain
/// - Remove CALSCALE:GREGORIAN (it's the default)
fn strip_ics_bloat(ics: &str, domain: &str) -> String {
    let mut result = String::with_capacity(ics.len());

    for line in ics.lines() {
        if line.starts_with("PRODID:") {
            result.push_str("PRODID:");
            result.push_str(domain);
            result.push_str("\r\n");
            continue;
        }

        if line == "CALSCALE:GREGORIAN" {
            continue;
        }

        result.push_str(line);
        result.push_str("\r\n");
    }

    result
}

fn add_date_property(ics_event: &mut icalendar::Event, name: &str, value: String) {
    let mut prop = Property::new(name, value);
    prop.append_parameter(ValueType::Date);
    ics_event.append_property(prop);
}
