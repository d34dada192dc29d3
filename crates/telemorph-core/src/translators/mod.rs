//! Concrete translators.
//!
//! - [`macsec`]: stateful, aggregates per-session flags into a status label
//! - [`rename`]: stateless, moves values between binding templates

pub mod macsec;
pub mod rename;
