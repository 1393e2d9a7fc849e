//! Behaviour tests for plugin activation.

mod behaviour;
