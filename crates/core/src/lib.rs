//! Core business logic for Factura.
//!
//! This crate contains pure business logic with no web or database
//! dependencies. Domain types, validation rules and calculations live here;
//! `factura-db` persists them and `factura-api` exposes them over HTTP.
//!
//! # Modules
//!
//! - `auth` - Roles, the authorization policy table and password hashing
//! - `business` - Business, tax-rate and settings validation
//! - `invoice` - Totals, numbering, status machine and recurring dates
//! - `expense` - Expense approval workflow and ownership rules
//! - `pdf` - Invoice PDF rendering
//! - `storage` - Object storage for receipts and invoice PDFs

pub mod auth;
pub mod business;
pub mod expense;
pub mod invoice;
pub mod pdf;
pub mod storage;
