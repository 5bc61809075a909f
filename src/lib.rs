//! Static gallery generator for Rive animation assets.
//!
//! A CSV table describes one asset per row. Each row is normalized into an
//! [`table::AssetDescriptor`], its input cells are parsed into
//! [`input_spec::InputSpec`]s, and [`controls`] turns those into the controls
//! and runtime bindings that [`page`] renders into index and detail pages.

pub mod config;
pub mod controls;
pub mod error_codes;
pub mod input_spec;
pub mod markup;
pub mod page;
pub mod pagination;
pub mod publish;
pub mod site;
pub mod sync;
pub mod table;
