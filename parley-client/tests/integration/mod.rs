pub mod call_setup_tests;
pub mod teardown_tests;
