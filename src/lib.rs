//! Escapement geometry generator and live rigid-body preview.
//!
//! The pure generator lives in [`geometry`]: it turns a [`params::MechanismParams`]
//! record into pixel-space outlines for an escape wheel, a pallet fork and its
//! banking pins.  [`assembly`] spawns those outlines as Rapier bodies, and
//! [`simulation::EscapementPlugin`] rebuilds them whenever the
//! [`params::ParameterForm`] changes.  [`drag`] lets the moving parts be
//! pulled around with the mouse.

pub mod assembly;
pub mod config;
pub mod constants;
pub mod drag;
pub mod error;
pub mod format;
pub mod geometry;
pub mod graphics;
pub mod panel;
pub mod params;
pub mod rendering;
pub mod simulation;
