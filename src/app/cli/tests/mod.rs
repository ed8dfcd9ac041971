//! Tests for configuration layering
