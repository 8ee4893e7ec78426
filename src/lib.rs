// lib.rs
#![forbid(unsafe_code)]

pub mod behaviors;
pub mod devices;
pub mod driver;
pub mod entity;
pub mod entry;
pub mod error;
pub mod predicate;
pub mod walker;
pub mod windows;

pub use crate::behaviors::{Behaviors, BehaviorsSource, RecurseDirection, RecurseFileSystem, RecursePolicy};
pub use crate::devices::DeviceSet;
pub use crate::entity::{CompareResult, Entity, OperationCode, StringEntity};
pub use crate::entry::EntryRecord;
pub use crate::error::WalkerError;
pub use crate::walker::Walker;
