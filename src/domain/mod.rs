pub mod alarms;
pub mod calendar;
pub mod dispatch;
pub mod energy;
pub mod inbound;
pub mod models;
pub mod numeric;
pub mod ports;
pub mod quiet_hours;
pub mod report;
pub mod template;
