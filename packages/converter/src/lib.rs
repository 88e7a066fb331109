//! QTI Converter - Convert QTI 1.2 quiz exports into Learnosity content.
//!
//! This crate reads a course export archive (QTI 1.2 assessments and item
//! banks listed in `imsmanifest.xml`) and produces a zip archive of
//! Learnosity activities, items, questions and features.
//!
//! # Example
//!
//! ```
//! use qti_converter::graph::{ConversionRun, GraphBuilder};
//! use qti_converter::{convert_assessment_xml, ConvertOptions};
//!
//! let xml = r#"<questestinterop><assessment ident="quiz1" title="Quiz">
//!   <section ident="root_section">
//!     <item ident="q1"><itemmetadata><qtimetadata>
//!       <qtimetadatafield><fieldlabel>question_type</fieldlabel><fieldentry>essay_question</fieldentry></qtimetadatafield>
//!     </qtimetadata></itemmetadata>
//!     <presentation><material><mattext>Discuss</mattext></material></presentation></item>
//!   </section>
//! </assessment></questestinterop>"#;
//!
//! let builder = GraphBuilder::new(&ConvertOptions::default());
//! let mut run = ConversionRun::new();
//! let assessment = convert_assessment_xml(&builder, &mut run, xml, "quiz1").unwrap();
//!
//! assert_eq!(assessment.item_refs().len(), 1);
//! assert_eq!(run.widgets()[0].type_tag(), "longtextV2");
//! ```
//!
//! # Architecture
//!
//! The converter is organized into several modules:
//!
//! - [`config`]: Configuration constants, options and validation
//! - [`types`]: Core data types (Widget, Item, Assessment, etc.)
//! - [`error`]: Error types and Result alias
//! - [`xml`]: XML utilities
//! - [`questions`]: Extensible question converter system
//! - [`answers`]: Combinatorial answer expansion for multi-blank questions
//! - [`assets`]: Embedded file reference rewriting
//! - [`graph`]: Item/widget reference graph
//! - [`manifest`]: Archive manifest parsing
//! - [`archive`]: Source archive access
//! - [`export`]: Export archive writing
//! - [`cli`]: Command-line interface
//! - [`converter`]: Main converter service

pub mod answers;
pub mod archive;
pub mod assets;
pub mod cli;
pub mod config;
pub mod converter;
pub mod error;
pub mod export;
pub mod graph;
pub mod manifest;
pub mod questions;
pub mod types;
pub mod xml;

// Re-export main functions
pub use converter::{
    convert_archive, convert_assessment_xml, convert_item_bank_xml, convert_source,
    convert_to_writer, ConversionReport,
};

// Re-export commonly used items
pub use config::{ConvertOptions, MatchingLayout};
pub use error::{ConverterError, Result};
pub use types::{Assessment, Item, ItemBank, Widget, WidgetKind};
