//! tabspan — snippet expansion and hot-spot navigation for text editors.
//!
//! The crate implements the completion subsystem of an editor without any of
//! the editor: hosts plug in through the [`buffer::EditBuffer`] trait, feed
//! events in as [`buffer::Notification`] values, and get popup requests
//! back. The interesting machinery is the snippet engine — templates with
//! numbered hot-spot placeholders are expanded into the buffer, the
//! resulting regions are tracked while the user edits, and Tab/Shift+Tab
//! move a (possibly multi-range, mirrored) selection between them.
//!
//! A rope-backed reference buffer ([`rope_buffer::RopeBuffer`]) makes the
//! whole engine drivable headlessly; the `tabspan` binary is a small demo
//! harness built on it.

pub mod buffer;
pub mod config;
pub mod engine;
pub mod error;
pub mod expand;
pub mod logging;
pub mod nav;
pub mod paths;
pub mod rope_buffer;
pub mod session;
pub mod store;
pub mod tracker;
