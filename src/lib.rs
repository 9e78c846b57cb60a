//! Care Billing reconciliation engine for ambulatory long-term care
//!
//! This crate reconciles an insurer approval (service codes allowed per week
//! or month) against the services actually delivered, and splits the delivery
//! into an insurer invoice and a private invoice. It applies the calendar rule
//! for weekly approvals, the meal and care-intensity substitution rules, the
//! training levy, the investment surcharge and the insurer budget.

#![warn(missing_docs)]

pub mod api;
pub mod calculation;
pub mod config;
pub mod error;
pub mod models;
