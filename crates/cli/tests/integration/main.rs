mod baseline_tests;
mod common;
mod synth_tests;
