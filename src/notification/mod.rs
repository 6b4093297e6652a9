//! Notification dispatch core.
//!
//! Both entry protocols converge on `Dispatcher::dispatch`, which resolves
//! the template, renders it, persists the mail attempt and hands the
//! rendered artifact to the transport gateway.

mod dispatcher;
mod types;

pub use dispatcher::{Dispatcher, DispatcherStats, DispatcherStatsSnapshot};
pub use types::{DispatchError, DispatchReceipt, NotificationIntent};
