//! Moo Deng Core - Storefront domain library.
//!
//! This crate provides the state and rules shared by every Moo Deng component:
//! - `storefront` - JSON storefront API backed by per-visitor sessions
//! - `cli` - Command-line tools for browsing the catalog
//!
//! # Architecture
//!
//! The core crate contains no HTTP and no async runtime. Cart and wishlist
//! containers are generic over a [`storage::KeyValueStore`] and take their
//! analytics sink as an injected [`analytics::AnalyticsSink`], so tests can
//! build isolated instances over an in-memory store.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, prices, and emails
//! - [`catalog`] - Immutable product and category table
//! - [`storage`] - Key/value persistence seam with JSON helpers
//! - [`cart`] - Cart state container
//! - [`wishlist`] - Wishlist state container
//! - [`recently_viewed`] - Recently viewed product ids
//! - [`filter`] - Shop filter and sort pipeline
//! - [`checkout`] - Order totals and the simulated checkout flow
//! - [`analytics`] - Commerce events and the sink interface

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod analytics;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod filter;
pub mod recently_viewed;
pub mod storage;
pub mod types;
pub mod wishlist;

pub use types::*;
