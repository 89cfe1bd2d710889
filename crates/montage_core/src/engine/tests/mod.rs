
mod integration_tests;
