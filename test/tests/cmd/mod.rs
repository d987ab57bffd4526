mod initializers_tests;
mod import_tests;
