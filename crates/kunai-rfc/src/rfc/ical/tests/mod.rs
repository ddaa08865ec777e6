//! Cross-module tests for the recurrence stack.
