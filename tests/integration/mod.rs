mod cli_tests;
mod config_tests;
mod reap_tests;
mod shutdown_tests;
