//! Integration tests for the search pipeline and the HTTP clients.

mod client_tests;
mod pipeline_tests;
