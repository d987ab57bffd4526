mod simulate_tests;
