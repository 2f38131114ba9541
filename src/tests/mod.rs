// mimir-service/src/tests/mod.rs
mod lifecycle_tests;
