//! Types the storefront keeps in the visitor's session.

pub mod session;

pub use session::{ConfirmedOrder, CurrentCustomer, Notice, NoticeLevel, keys as session_keys};
