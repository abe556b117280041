// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Static validation of swarmlet configurations.
//!
//! Validation runs before any accessor is instantiated, so it only checks what the file
//! itself can tell:
//!
//! 1. **Name**: the swarmlet has a non-empty name
//! 2. **Uniqueness**: contained accessor names are unique
//! 3. **Classes**: every class is served by the source provider, when one is given
//! 4. **Endpoints**: every connection endpoint names a declared accessor, or a port of
//!    the swarmlet with the right direction
//! 5. **Single source**: no destination is fed by two connections
//!
//! Ports of contained accessors and causality loops are only known once definitions ran
//! their `setup`; building the swarmlet reports those as engine errors.
//!
//! All checks run and every problem is reported, so a file can be fixed in one pass.
//!
//! # Examples
//!
//! ```rust
//! use swarmlet::config::{parse_config, validate_swarmlet, ConfigFormat};
//! use swarmlet::errors::ValidationError;
//!
//! let config = parse_config(
//!     r#"
//! name: broken
//! outputs: { output: {} }
//! accessors:
//!   - { name: a, class: identity }
//!   - { name: a, class: identity }
//! connections:
//!   - { from: ghost.output, to: output }
//! "#,
//!     ConfigFormat::Yaml,
//! )
//! .unwrap();
//!
//! let errors = validate_swarmlet(&config, None).unwrap_err();
//! assert_eq!(errors.len(), 2);
//! assert!(matches!(errors[0], ValidationError::DuplicateAccessorName { .. }));
//! assert!(matches!(errors[1], ValidationError::UnresolvedEndpoint { .. }));
//! ```

use std::collections::{BTreeMap, HashSet};

use crate::config::{Endpoint, SwarmletConfig};
use crate::errors::ValidationError;
use crate::traits::SourceProvider;

/// Validate a swarmlet, returning every problem found.
pub fn validate_swarmlet(
    config: &SwarmletConfig,
    provider: Option<&dyn SourceProvider>,
) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.name.trim().is_empty() {
        errors.push(ValidationError::EmptyName);
    }
    errors.extend(validate_unique_names(config));
    if let Some(provider) = provider {
        errors.extend(validate_classes(config, provider));
    }
    errors.extend(validate_endpoints(config));
    errors.extend(validate_single_source(config));

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_unique_names(config: &SwarmletConfig) -> Vec<ValidationError> {
    let mut seen = HashSet::new();
    config
        .accessors
        .iter()
        .filter(|accessor| !seen.insert(accessor.name.as_str()))
        .map(|accessor| ValidationError::DuplicateAccessorName {
            name: accessor.name.clone(),
        })
        .collect()
}

fn validate_classes(config: &SwarmletConfig, provider: &dyn SourceProvider) -> Vec<ValidationError> {
    config
        .accessors
        .iter()
        .filter(|accessor| !provider.contains(&accessor.class))
        .map(|accessor| ValidationError::UnknownAccessorClass {
            accessor: accessor.name.clone(),
            class: accessor.class.clone(),
        })
        .collect()
}

#[derive(Clone, Copy)]
enum Position {
    Source,
    Destination,
}

fn check_endpoint(
    config: &SwarmletConfig,
    accessors: &HashSet<&str>,
    text: &str,
    position: Position,
) -> Option<ValidationError> {
    match Endpoint::parse(text) {
        Endpoint::Accessor { accessor, port } => {
            if accessor.is_empty() || port.is_empty() {
                Some(ValidationError::UnresolvedEndpoint {
                    endpoint: text.to_string(),
                    reason: "expected 'accessor.port'".to_string(),
                })
            } else if !accessors.contains(accessor) {
                Some(ValidationError::UnresolvedEndpoint {
                    endpoint: text.to_string(),
                    reason: format!("no accessor named '{}'", accessor),
                })
            } else {
                None
            }
        }
        Endpoint::Container(port) => {
            let is_input = config.inputs.contains_key(port);
            let is_output = config.outputs.contains_key(port);
            match (position, is_input, is_output) {
                (Position::Source, true, _) | (Position::Destination, _, true) => None,
                (Position::Source, false, true) => Some(ValidationError::InvalidDirection {
                    endpoint: text.to_string(),
                    reason: "an output of the swarmlet cannot feed a connection".to_string(),
                }),
                (Position::Destination, true, false) => Some(ValidationError::InvalidDirection {
                    endpoint: text.to_string(),
                    reason: "an input of the swarmlet cannot be fed from inside".to_string(),
                }),
                (_, false, false) => Some(ValidationError::UnresolvedEndpoint {
                    endpoint: text.to_string(),
                    reason: format!("'{}' is not a port of '{}'", port, config.name),
                }),
            }
        }
    }
}

fn validate_endpoints(config: &SwarmletConfig) -> Vec<ValidationError> {
    let accessors: HashSet<&str> = config.accessors.iter().map(|a| a.name.as_str()).collect();
    let mut errors = Vec::new();
    for connection in &config.connections {
        errors.extend(check_endpoint(config, &accessors, &connection.from, Position::Source));
        errors.extend(check_endpoint(
            config,
            &accessors,
            &connection.to,
            Position::Destination,
        ));
    }
    errors
}

fn validate_single_source(config: &SwarmletConfig) -> Vec<ValidationError> {
    let mut sources: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    let mut order = Vec::new();
    for connection in &config.connections {
        let entry = sources.entry(connection.to.as_str()).or_insert_with(|| {
            order.push(connection.to.as_str());
            Vec::new()
        });
        entry.push(connection.from.clone());
    }

    order
        .into_iter()
        .filter_map(|destination| {
            let feeding = &sources[destination];
            (feeding.len() > 1).then(|| ValidationError::DestinationFedTwice {
                destination: destination.to_string(),
                sources: feeding.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::local::LibrarySourceProvider;
    use crate::config::{parse_config, ConfigFormat};

    fn config(yaml: &str) -> SwarmletConfig {
        parse_config(yaml, ConfigFormat::Yaml).unwrap()
    }

    #[test]
    fn test_valid_pipeline() {
        let config = config(
            r#"
name: ok
inputs: { input: {} }
outputs: { output: {} }
accessors:
  - { name: a, class: identity }
connections:
  - { from: input, to: a.input }
  - { from: a.output, to: output }
"#,
        );
        let provider = LibrarySourceProvider::new();
        assert!(validate_swarmlet(&config, Some(&provider)).is_ok());
    }

    #[test]
    fn test_each_problem_is_reported() {
        let test_cases = vec![
            (
                "name: ''",
                ValidationError::EmptyName,
            ),
            (
                "{ name: s, accessors: [ { name: a, class: nope/Missing } ] }",
                ValidationError::UnknownAccessorClass {
                    accessor: "a".to_string(),
                    class: "nope/Missing".to_string(),
                },
            ),
            (
                "{ name: s, accessors: [ { name: a, class: identity } ], connections: [ { from: a.output, to: b.input } ] }",
                ValidationError::UnresolvedEndpoint {
                    endpoint: "b.input".to_string(),
                    reason: "no accessor named 'b'".to_string(),
                },
            ),
            (
                "{ name: s, outputs: { out: {} }, connections: [ { from: out, to: out } ] }",
                ValidationError::InvalidDirection {
                    endpoint: "out".to_string(),
                    reason: "an output of the swarmlet cannot feed a connection".to_string(),
                },
            ),
            (
                "{ name: s, inputs: { in: {} }, connections: [ { from: in, to: in } ] }",
                ValidationError::InvalidDirection {
                    endpoint: "in".to_string(),
                    reason: "an input of the swarmlet cannot be fed from inside".to_string(),
                },
            ),
            (
                "{ name: s, connections: [ { from: nowhere, to: .x } ] }",
                ValidationError::UnresolvedEndpoint {
                    endpoint: "nowhere".to_string(),
                    reason: "'nowhere' is not a port of 's'".to_string(),
                },
            ),
        ];

        let provider = LibrarySourceProvider::new();
        for (yaml, expected) in test_cases {
            let errors = validate_swarmlet(&config(yaml), Some(&provider)).unwrap_err();
            assert_eq!(errors[0], expected, "config {}", yaml);
        }
    }

    #[test]
    fn test_destination_fed_twice_lists_sources_in_file_order() {
        let config = config(
            r#"
name: s
inputs: { x: {}, y: {} }
accessors:
  - { name: a, class: identity }
connections:
  - { from: y, to: a.input }
  - { from: x, to: a.input }
"#,
        );
        let errors = validate_swarmlet(&config, None).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::DestinationFedTwice {
                destination: "a.input".to_string(),
                sources: vec!["y".to_string(), "x".to_string()],
            }]
        );
    }

    #[test]
    fn test_classes_unchecked_without_provider() {
        let config = config("{ name: s, accessors: [ { name: a, class: nope/Missing } ] }");
        assert!(validate_swarmlet(&config, None).is_ok());
    }
}
