//! # Communications interface crate.
//!
//! Provides all common communications interfaces for the software.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Packet types and payload encodings
pub mod packet;

/// Command and demand definitions for equipment (like thrusters)
pub mod eqpt;

/// Network module
pub mod net;
