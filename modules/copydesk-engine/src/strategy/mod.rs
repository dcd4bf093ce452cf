//! One strategy per content type, selected once at run start. Each
//! strategy colocates the pieces that vary by type: the prompt task block,
//! the revise format rules, output shaping, rules penalties, lexicon
//! bonuses, the critic rubric, and the structural fix list.

mod internal_comms;
mod microcopy;
mod press_release;

use copydesk_common::{ContentType, RequestParams};

use crate::policy::Policy;
use crate::prompt::PromptInputs;

pub trait ContentStrategy: Send + Sync {
    /// Output-token budget for generation calls.
    fn max_tokens(&self) -> u32;

    /// The user half of the generate prompt.
    fn generate_task(&self, inputs: &PromptInputs<'_>) -> String;

    /// Channel/context format rules injected into a revise prompt.
    fn revise_rules(&self, params: &RequestParams) -> String;

    /// The original structured request, re-stated to anchor revisions.
    fn original_request(&self, params: &RequestParams) -> String;

    /// Type-specific half of output shaping (base cleanup already applied).
    fn shape(&self, text: &str, params: &RequestParams) -> String;

    /// Sum of rules penalties (a non-positive delta from the 40 ceiling).
    fn rules_penalty(&self, text: &str, params: &RequestParams, policy: &Policy) -> i32;

    /// Type-specific lexicon bonus (non-negative delta).
    fn lexicon_bonus(&self, text: &str, params: &RequestParams, policy: &Policy) -> i32;

    /// Writing-quality rubric for the critic call.
    fn critic_rubric(&self, params: &RequestParams) -> &'static str;

    /// Structural fixes offered when the rules sub-score is weak.
    fn structural_fixes(&self, params: &RequestParams) -> Vec<String>;
}

static MICROCOPY: microcopy::MicrocopyStrategy = microcopy::MicrocopyStrategy;
static INTERNAL_COMMS: internal_comms::InternalCommsStrategy =
    internal_comms::InternalCommsStrategy;
static PRESS_RELEASE: press_release::PressReleaseStrategy = press_release::PressReleaseStrategy;

pub fn strategy_for(content_type: ContentType) -> &'static dyn ContentStrategy {
    match content_type {
        ContentType::Microcopy => &MICROCOPY,
        ContentType::InternalComms => &INTERNAL_COMMS,
        ContentType::PressRelease => &PRESS_RELEASE,
    }
}
