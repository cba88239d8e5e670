mod cooldown;
mod subscriber_list;

pub use cooldown::*;
pub use subscriber_list::*;
