//! keyline - an Emacs-style terminal text editor
//!
//! This library exposes the interaction layer (key dispatch, minibuffer,
//! query-replace, visual line navigation) and the reference document engine
//! for testing and embedding.

pub mod app;
pub mod command;
pub mod config;
pub mod confirm_dialog;
pub mod dispatcher;
pub mod engine;
pub mod input;
pub mod keys;
pub mod minibuffer;
pub mod mode;
pub mod query_replace;
pub mod region;
pub mod surface;
pub mod ui;
pub mod visual_line;
