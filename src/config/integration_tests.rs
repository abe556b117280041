// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Swarmlet files under `configs/` loaded, validated, built and run.

use std::rc::Rc;

use serde_json::json;

use crate::backends::local::LibrarySourceProvider;
use crate::backends::timers::ManualTimers;
use crate::config::{load_and_validate_config, SwarmletBuilder};
use crate::engine::Runtime;
use crate::errors::{ConfigError, EngineError, ValidationError};

fn runtime() -> (Runtime, Rc<ManualTimers>) {
    let timers = Rc::new(ManualTimers::new());
    let runtime = Runtime::new(Rc::new(LibrarySourceProvider::new()), timers.clone());
    (runtime, timers)
}

#[test]
fn test_linear_composite_yaml() {
    let provider = LibrarySourceProvider::new();
    let config = load_and_validate_config("configs/linear-composite.yaml", Some(&provider)).unwrap();
    assert_eq!(config.name, "linear");
    assert_eq!(config.accessors.len(), 2);

    let (mut runtime, timers) = runtime();
    let swarmlet = SwarmletBuilder::build(&config, &mut runtime).unwrap();
    swarmlet.initialize().unwrap();

    swarmlet.provide_input("input", json!(10)).unwrap();
    timers.run_until_idle();
    assert_eq!(swarmlet.latest_output("output").unwrap(), json!(25));

    swarmlet.provide_input("input", json!(-2.5)).unwrap();
    timers.run_until_idle();
    assert_eq!(swarmlet.latest_output("output").unwrap(), json!(0));
    assert!(runtime.take_errors().is_empty());
}

#[test]
fn test_ramp_toml_ticks_through_affine() {
    let provider = LibrarySourceProvider::new();
    let config = load_and_validate_config("configs/ramp-logger.toml", Some(&provider)).unwrap();

    let (mut runtime, timers) = runtime();
    let swarmlet = SwarmletBuilder::build(&config, &mut runtime).unwrap();
    swarmlet.initialize().unwrap();

    timers.advance(std::time::Duration::from_millis(250));
    assert_eq!(swarmlet.latest_output("output").unwrap(), json!(20.5));

    swarmlet.wrapup().unwrap();
    assert_eq!(timers.pending(), 0);
}

#[test]
fn test_feedback_loop_rejected_at_initialize() {
    let config = load_and_validate_config("configs/feedback-loop.yaml", None).unwrap();

    let (mut runtime, _timers) = runtime();
    let swarmlet = SwarmletBuilder::build(&config, &mut runtime).unwrap();
    let error = swarmlet.initialize().unwrap_err();
    match error {
        EngineError::CausalityLoop { accessor, cycle } => {
            assert_eq!(accessor, "loop.a");
            assert!(cycle.contains(&"loop.a".to_string()));
            assert!(cycle.contains(&"loop.b".to_string()));
        }
        other => panic!("expected a causality loop, got {}", other),
    }
}

#[test]
fn test_invalid_file_reports_every_problem() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.yaml");
    std::fs::write(
        &path,
        r#"
name: broken
accessors:
  - { name: a, class: identity }
  - { name: a, class: math/Nope }
connections:
  - { from: a.output, to: missing.input }
"#,
    )
    .unwrap();

    let provider = LibrarySourceProvider::new();
    let error = load_and_validate_config(&path, Some(&provider)).unwrap_err();
    let ConfigError::Invalid(errors) = error else {
        panic!("expected validation errors");
    };
    assert_eq!(
        errors,
        vec![
            ValidationError::DuplicateAccessorName {
                name: "a".to_string()
            },
            ValidationError::UnknownAccessorClass {
                accessor: "a".to_string(),
                class: "math/Nope".to_string()
            },
            ValidationError::UnresolvedEndpoint {
                endpoint: "missing.input".to_string(),
                reason: "no accessor named 'missing'".to_string()
            },
        ]
    );
}
