//! URL handling module for site-canon
//!
//! This module provides link normalization for discovery, the resume key used
//! to match checkpoint rows, and site/project naming helpers.

mod domain;
mod normalize;

pub use domain::{dominant_project, extract_domain, project_from_title, project_name, site_key};
pub use normalize::{ensure_scheme, normalize_link, resume_key};
