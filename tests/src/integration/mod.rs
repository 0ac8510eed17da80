//! Cross-component lifecycle tests.

mod lifecycle;
