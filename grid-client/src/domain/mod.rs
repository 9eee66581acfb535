pub mod alert;
pub mod reading;

pub use alert::{Alert, NewAlert, POSSIBLE_THEFT};
pub use reading::{Consumer, Meter, NewReading, Reading};
