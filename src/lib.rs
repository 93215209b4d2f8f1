//! Encore Rentals - Equipment Rental Storefront Backend
//!
//! This crate implements the order payment lifecycle: expiration of stale
//! unpaid reservations, card gateway integration, and installment scheduling
//! for large bookings.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
