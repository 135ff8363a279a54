//! Common utilities for Veles.
//!
//! This crate provides the foundational types used across the workspace:
//!
//! - [`BinaryReader`] / [`BinaryWriter`] - byte-order-switching cursors
//! - [`FourCC`] - four-character chunk codes
//! - [`Error`] - cursor-level errors

mod error;
mod fourcc;
mod reader;

pub use error::{Error, Result};
pub use fourcc::FourCC;
pub use reader::{BinaryReader, BinaryWriter, Endianness};
