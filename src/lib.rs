//! Mailsink — scheduled batch pipeline that samples raw email records,
//! stages them in a document store, and normalizes parsed MIME content
//! into a relational schema.

pub mod config;
pub mod dataset;
pub mod error;
pub mod parser;
pub mod pipeline;
pub mod sampler;
pub mod store;
