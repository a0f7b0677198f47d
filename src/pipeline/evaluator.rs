//! Operation Pipeline Evaluator
//!
//! Runs an ordered list of label operations against one resource and produces
//! the proposed label mapping. Pure and deterministic: no clock, no randomness,
//! no mutation of the input resource.

use crate::error::EngineError;
use crate::models::{
    BatchOutcome, Casing, GceResource, LabelMapping, LabelOperation, OperationType, RegexGroup,
    SavedPipeline,
};
use crate::pipeline::source::{compile_regex, Matcher, SourceField};
use regex::Regex;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// What a CASE_TRANSFORM rewrites
#[derive(Debug)]
enum CaseTarget<'a> {
    /// The value stored under this key
    Value(&'a str),
    /// This key's name, or every key name when `None`
    KeyNames(Option<&'a str>),
}

/// An operation whose config has been checked and whose patterns are compiled
#[derive(Debug)]
enum Step<'a> {
    Add { key: &'a str, value: &'a str },
    Remove { key: &'a str },
    Replace { key: &'a str, value: &'a str },
    Pattern { key: &'a str, find: &'a str, replace: &'a str },
    ExtractRegex { source: SourceField, regex: Regex, groups: &'a [RegexGroup] },
    CaseTransform { target: CaseTarget<'a>, casing: Casing },
    NormalizeValues { key: &'a str, value_map: &'a BTreeMap<String, String> },
    ConditionalSet { source: SourceField, matcher: Matcher, key: &'a str, value: &'a str },
}

fn required<'a>(field: &'a Option<String>, name: &str, context: &str) -> Result<&'a str, EngineError> {
    field
        .as_deref()
        .ok_or_else(|| EngineError::configuration(context, format!("missing required config field '{}'", name)))
}

impl<'a> Step<'a> {
    fn compile(op: &'a LabelOperation) -> Result<Self, EngineError> {
        let context = op.context();
        let config = &op.config;

        let step = match op.op_type {
            OperationType::Add => Step::Add {
                key: required(&config.key, "key", &context)?,
                value: required(&config.value, "value", &context)?,
            },
            OperationType::Remove => Step::Remove {
                key: required(&config.key, "key", &context)?,
            },
            OperationType::Replace => Step::Replace {
                key: required(&config.key, "key", &context)?,
                value: required(&config.value, "value", &context)?,
            },
            OperationType::Pattern => {
                let find = required(&config.find, "find", &context)?;
                if find.is_empty() {
                    return Err(EngineError::configuration(&context, "'find' must not be empty"));
                }
                Step::Pattern {
                    key: required(&config.key, "key", &context)?,
                    find,
                    replace: config.replace.as_deref().unwrap_or(""),
                }
            }
            OperationType::ExtractRegex => {
                let regex = compile_regex(required(&config.regex, "regex", &context)?, &context)?;
                let source = SourceField::parse(
                    required(&config.source_field, "sourceField", &context)?,
                    config.delimiter.as_deref(),
                    &context,
                )?;
                if config.groups.is_empty() {
                    return Err(EngineError::configuration(&context, "'groups' must not be empty"));
                }
                if let Some(group) = config.groups.iter().find(|g| g.index >= regex.captures_len()) {
                    return Err(EngineError::configuration(
                        &context,
                        format!(
                            "capture group {} does not exist (pattern has {} groups)",
                            group.index,
                            regex.captures_len() - 1
                        ),
                    ));
                }
                Step::ExtractRegex {
                    source,
                    regex,
                    groups: &config.groups,
                }
            }
            OperationType::CaseTransform => {
                let casing = config.casing.ok_or_else(|| {
                    EngineError::configuration(&context, "missing required config field 'casing'")
                })?;
                let target = match config.target_key.as_deref() {
                    Some(key) => CaseTarget::Value(key),
                    None => CaseTarget::KeyNames(config.key.as_deref()),
                };
                Step::CaseTransform { target, casing }
            }
            OperationType::NormalizeValues => Step::NormalizeValues {
                key: required(&config.key, "key", &context)?,
                value_map: &config.value_map,
            },
            OperationType::ConditionalSet => {
                let source = SourceField::parse(
                    required(&config.source_field, "sourceField", &context)?,
                    config.delimiter.as_deref(),
                    &context,
                )?;
                let operator = config.operator.ok_or_else(|| {
                    EngineError::configuration(&context, "missing required config field 'operator'")
                })?;
                let matcher = Matcher::build(
                    operator,
                    required(&config.match_value, "matchValue", &context)?,
                    &context,
                )?;
                Step::ConditionalSet {
                    source,
                    matcher,
                    key: required(&config.key, "key", &context)?,
                    value: required(&config.value, "value", &context)?,
                }
            }
        };

        Ok(step)
    }

    fn run(&self, resource: &GceResource, labels: &mut LabelMapping) {
        match self {
            Step::Add { key, value } => {
                if !labels.contains_key(*key) {
                    labels.insert(key.to_string(), value.to_string());
                }
            }
            Step::Remove { key } => {
                labels.remove(*key);
            }
            Step::Replace { key, value } => {
                labels.insert(key.to_string(), value.to_string());
            }
            Step::Pattern { key, find, replace } => {
                if let Some(current) = labels.get_mut(*key) {
                    if current.contains(find) {
                        *current = current.replace(find, replace);
                    }
                }
            }
            Step::ExtractRegex { source, regex, groups } => {
                let Some(input) = source.resolve(resource, labels).map(str::to_owned) else {
                    return;
                };
                let Some(captures) = regex.captures(&input) else {
                    return;
                };
                for group in groups.iter() {
                    if let Some(matched) = captures.get(group.index) {
                        labels.insert(group.target_key.clone(), matched.as_str().to_string());
                    }
                }
            }
            Step::CaseTransform { target, casing } => match target {
                CaseTarget::Value(key) => {
                    if let Some(current) = labels.get_mut(*key) {
                        *current = casing.apply(current);
                    }
                }
                CaseTarget::KeyNames(Some(key)) => {
                    if let Some(value) = labels.remove(*key) {
                        labels.insert(casing.apply(key), value);
                    }
                }
                CaseTarget::KeyNames(None) => {
                    let original = std::mem::take(labels);
                    for (key, value) in original {
                        labels.insert(casing.apply(&key), value);
                    }
                }
            },
            Step::NormalizeValues { key, value_map } => {
                if let Some(current) = labels.get_mut(*key) {
                    if let Some(normalized) = value_map.get(current.as_str()) {
                        *current = normalized.clone();
                    }
                }
            }
            Step::ConditionalSet { source, matcher, key, value } => {
                let matched = source
                    .resolve(resource, labels)
                    .map(|input| matcher.is_match(input))
                    .unwrap_or(false);
                if matched {
                    labels.insert(key.to_string(), value.to_string());
                }
            }
        }
    }
}

/// Stateless pipeline evaluator
pub struct PipelineEvaluator;

impl PipelineEvaluator {
    /// Apply a saved pipeline to one resource
    pub fn apply(resource: &GceResource, pipeline: &SavedPipeline) -> Result<LabelMapping, EngineError> {
        Self::apply_operations(resource, &pipeline.operations)
    }

    /// Apply operations strictly in order; each sees the previous one's output.
    /// Disabled operations are skipped. The first faulty operation aborts this resource.
    pub fn apply_operations(
        resource: &GceResource,
        operations: &[LabelOperation],
    ) -> Result<LabelMapping, EngineError> {
        let mut labels = resource.labels.clone();

        for op in operations.iter().filter(|op| op.enabled) {
            let step = Step::compile(op)?;
            step.run(resource, &mut labels);
        }

        Ok(labels)
    }

    /// Apply a pipeline to many resources. A faulty resource never aborts the batch.
    pub fn apply_batch(resources: &[GceResource], pipeline: &SavedPipeline) -> BatchOutcome<LabelMapping> {
        let mut outcome = BatchOutcome::default();

        for resource in resources {
            let result = Self::apply(resource, pipeline);
            if let Err(e) = &result {
                warn!("Pipeline {} failed for resource {}: {}", pipeline.id, resource.id, e);
            }
            outcome.record(resource.id.clone(), result);
        }

        debug!(
            "Pipeline {} evaluated over {} resources ({} failed)",
            pipeline.id,
            resources.len(),
            outcome.failed.len()
        );
        outcome.finish()
    }

    /// Structural check of one operation, independent of any resource
    pub fn check_operation(op: &LabelOperation) -> Result<(), EngineError> {
        Step::compile(op).map(|_| ())
    }
}
