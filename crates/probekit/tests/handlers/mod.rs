/// Handler tests
pub mod http_tests;
pub mod tcp_tests;
