//! Environment-driven knobs read by CI jobs.

pub mod property_test_profile;
