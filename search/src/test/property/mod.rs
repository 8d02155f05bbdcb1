//! Property-based tests for index assignment and candidate generation.
//!
//! Problems come from the generators of `tilegen-problem`; each property is
//! checked against every candidate the search emits.

mod assign_props;
