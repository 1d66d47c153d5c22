use chrono::{Local, NaiveDateTime};

/// Wall-clock "now" as a naive local date-time. Every stored timestamp and
/// every temporal comparison uses this one zone.
pub fn now() -> NaiveDateTime {
    Local::now().naive_local()
}
