mod client_version_tests;
mod http_tests;
mod trace_call;
