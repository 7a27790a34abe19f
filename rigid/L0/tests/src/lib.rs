//! Scenario tests live under `integration/`.
