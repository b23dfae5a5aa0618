//! Branch Survey Bot: collects daily branch answers over WhatsApp and reports them.

pub mod channels;
pub mod config;
pub mod distribution;
pub mod error;
pub mod report;
pub mod roster;
pub mod store;
pub mod survey;
pub mod webhook;
