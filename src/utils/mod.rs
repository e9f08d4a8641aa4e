//! Utilities for remotekit.
//!
//! Submodules:
//! - `interpolation`: the default template evaluator (`{{ path }}` tokens and bare `VALUE` / `HOLD_SECS`).

pub mod interpolation;
