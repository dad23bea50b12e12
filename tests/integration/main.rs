//! Integration tests for site-canon
//!
//! Discovery and capture run end-to-end against a scripted browser.

mod capture_tests;
mod discovery_tests;
mod support;
