mod common;
mod compile_tests;
mod gateway_tests;
mod parity_tests;
