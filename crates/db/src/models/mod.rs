//! Row structs and their conversions into core domain types.
//!
//! Each submodule contains a `FromRow` struct matching the table columns and
//! a `TryFrom` into the domain type. Enumerated columns are stored as text;
//! an unknown value surfaces as [`StoreError::Corrupt`].
//!
//! [`StoreError::Corrupt`]: achievo_core::ports::StoreError::Corrupt

pub mod document;
pub mod notification;
pub mod reference;
