//! The reference deployment: the six learning-platform walkers.

use super::{
    CapabilityDescriptor, CapabilityDomainError, CapabilityName, CapabilityRegistry,
    OperationName, ResourceLocator,
};
use camino::Utf8Path;

/// Import path prefix shared by the reference walkers.
pub const WALKER_IMPORT_PREFIX: &str = "walkers";

/// Extension of walker source artifacts.
pub const WALKER_SOURCE_EXTENSION: &str = "wat";

/// Walker name, default entry operation, fallback operation table.
const REFERENCE_WALKERS: [(&str, &str, [&str; 3]); 6] = [
    (
        "orchestrator",
        "init_user_graph",
        [
            "init_user_graph",
            "start_lesson_sequence",
            "coordinate_learning_workflow",
        ],
    ),
    (
        "content_curator",
        "get_lesson_content",
        [
            "get_lesson_content",
            "create_learning_material",
            "adapt_content_difficulty",
        ],
    ),
    (
        "quiz_master",
        "generate_adaptive_quiz",
        [
            "generate_adaptive_quiz",
            "create_question_set",
            "evaluate_quiz_performance",
        ],
    ),
    (
        "evaluator",
        "evaluate_code_response",
        [
            "evaluate_code_response",
            "evaluate_text_response",
            "provide_feedback",
        ],
    ),
    (
        "progress_tracker",
        "track_lesson_progress",
        [
            "track_lesson_progress",
            "update_mastery_scores",
            "get_learning_analytics",
        ],
    ),
    (
        "motivator",
        "generate_motivational_message",
        [
            "generate_motivational_message",
            "create_encouragement",
            "track_achievements",
        ],
    ),
];

/// Builds the descriptor of one reference walker.
///
/// # Errors
///
/// Returns [`CapabilityDomainError`] when a table entry fails validation.
fn walker_descriptor(
    artifact_dir: &Utf8Path,
    name: &str,
    default_operation: &str,
    fallback_operations: &[&str],
) -> Result<CapabilityDescriptor, CapabilityDomainError> {
    let locator = ResourceLocator::new(format!("{WALKER_IMPORT_PREFIX}.{name}"))?
        .with_source_path(artifact_dir.join(format!("{name}.{WALKER_SOURCE_EXTENSION}")));
    let fallback = fallback_operations
        .iter()
        .map(|operation| OperationName::new(*operation))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(
        CapabilityDescriptor::new(CapabilityName::new(name)?, locator)
            .with_default_operation(OperationName::new(default_operation)?)
            .with_fallback_operations(fallback),
    )
}

/// Builds the registry of the six reference walkers rooted at `artifact_dir`.
///
/// # Errors
///
/// Returns [`CapabilityDomainError`] when the static table is inconsistent.
pub fn reference_registry(
    artifact_dir: &Utf8Path,
) -> Result<CapabilityRegistry, CapabilityDomainError> {
    REFERENCE_WALKERS
        .iter()
        .try_fold(
            CapabilityRegistry::builder(),
            |builder, (name, default_operation, fallback)| {
                builder.register_descriptor(walker_descriptor(
                    artifact_dir,
                    name,
                    default_operation,
                    fallback,
                )?)
            },
        )
        .map(super::CapabilityRegistryBuilder::build)
}
