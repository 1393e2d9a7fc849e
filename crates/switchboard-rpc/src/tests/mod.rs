//! Behaviour tests for the dispatch engine.

mod behaviour;
