use time::{macros::format_description, OffsetDateTime};

/// `2024-03-09 14:05:00`, the layout used in the subscriber list and in
/// notification bodies.
pub fn format_timestamp(at: OffsetDateTime) -> Result<String, time::error::Format> {
    at.format(format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second]"
    ))
}
