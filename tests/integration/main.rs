//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises the failover component
//! against simulated adapters.  All tests run on the host (x86_64) with
//! no radio hardware required.

mod failover_scenario_tests;
mod mock_radio;
