//! Unit tests for the register-frame store.
