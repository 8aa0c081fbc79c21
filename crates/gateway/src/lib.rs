//! HTTP surface for the multisession store: the middleware that hands each
//! request a subsession id, the layer that loads and saves the session
//! around every handler, link-option propagation, the CLI and the
//! background sweeper.

pub mod api;
pub mod bootstrap;
pub mod cli;
pub mod session_layer;
pub mod state;
pub mod subsession;
pub mod sweeper;
pub mod url_options;
