/// Protocol module tests
pub mod request_serialization_tests;
pub mod response_serialization_tests;
