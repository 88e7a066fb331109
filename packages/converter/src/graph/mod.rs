//! Reference graph of items, widgets and activities.
//!
//! [`GraphBuilder`] turns QTI documents into items and widgets;
//! [`ConversionRun`] holds everything produced for one archive.

mod builder;
mod run;

pub use builder::GraphBuilder;
pub use run::ConversionRun;
