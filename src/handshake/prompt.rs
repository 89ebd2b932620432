use crate::idp::types::STEP_TYPE_MULTI_OPTIONS;
use crate::idp::NextStep;

pub const SELECTION_INSTRUCTION: &str = "Select an authentication method:";
pub const DEFAULT_INSTRUCTION: &str = "Please provide the following information:";
pub const NO_METHODS_INSTRUCTION: &str = "No auth methods available.";

/// Keyboard-interactive questions for one step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prompt {
    pub instruction: String,
    pub questions: Vec<String>,
    pub echos: Vec<bool>,
}

/// The step asks the user to pick one of several authenticators.
///
/// Depends on the IdP labelling such steps `MULTI_OPTIONS_PROMPT`.
#[must_use]
pub fn is_selection_prompt(step: &NextStep) -> bool {
    step.step_type == STEP_TYPE_MULTI_OPTIONS && step.authenticators.len() > 1
}

#[must_use]
pub fn prompt_for(step: Option<&NextStep>) -> Prompt {
    let Some(step) = step.filter(|s| s.has_authenticators()) else {
        return Prompt {
            instruction: NO_METHODS_INSTRUCTION.to_string(),
            ..Prompt::default()
        };
    };

    if is_selection_prompt(step) {
        let mut question = String::new();
        for (index, authenticator) in step.authenticators.iter().enumerate() {
            question.push_str(&format!("{} for {} ", index + 1, authenticator.authenticator));
        }
        question.push_str("Enter selection: ");
        return Prompt {
            instruction: SELECTION_INSTRUCTION.to_string(),
            questions: vec![question],
            echos: vec![true],
        };
    }

    let (questions, echos) = step.authenticators[0]
        .prompted_params()
        .map(|param| (format!("{}: ", param.display_name), !param.confidential))
        .unzip();

    let instruction = step
        .messages
        .first()
        .map_or_else(|| DEFAULT_INSTRUCTION.to_string(), |m| m.message.clone());

    Prompt {
        instruction,
        questions,
        echos,
    }
}
