//! Declarative UI flows
//!
//! A flow is a JSON file of steps (navigate, fill, click, expect, open a
//! dropdown, pick a menu item, handle a native dialog) executed by
//! [`FlowRunner`] against a [`crate::Surface`].

pub mod runner;
pub mod script;

pub use runner::FlowRunner;
pub use script::{
    Flow, FlowReport, FlowSettings, FlowStep, MenuItem, StepResult, StepStatus,
};
