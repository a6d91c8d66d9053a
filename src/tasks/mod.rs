//! The user-facing operator tasks, one pipeline each.

pub mod firewall;
pub mod web;
