//! Shell-level tests with in-memory boundaries

mod fakes;
