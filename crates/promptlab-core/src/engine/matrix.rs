//! Trial matrix expansion: the Cartesian product of prompts, test cases,
//! and model identifiers, in deterministic order.

use crate::errors::EngineError;
use crate::model::{CaseSpec, PromptSpec, TrialSpec};

/// Expand the full matrix as an ordered sequence: prompts outermost, then
/// cases, then models. Identical inputs always yield the same sequence, so
/// repeated runs are reproducible in generation order.
///
/// An empty input list is a configuration error, not a silently empty run.
pub fn expand_matrix(
    prompts: &[PromptSpec],
    cases: &[CaseSpec],
    models: &[String],
) -> Result<Vec<TrialSpec>, EngineError> {
    if prompts.is_empty() {
        return Err(EngineError::Config("prompt list is empty".into()));
    }
    if cases.is_empty() {
        return Err(EngineError::Config("test case list is empty".into()));
    }
    if models.is_empty() {
        return Err(EngineError::Config("model list is empty".into()));
    }

    let mut trials = Vec::with_capacity(prompts.len() * cases.len() * models.len());
    for prompt in prompts {
        for case in cases {
            for model in models {
                trials.push(TrialSpec {
                    prompt: prompt.clone(),
                    case: case.clone(),
                    model: model.clone(),
                });
            }
        }
    }
    Ok(trials)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompts(ids: &[&str]) -> Vec<PromptSpec> {
        ids.iter().map(|id| PromptSpec::new(*id, format!("system for {id}"))).collect()
    }

    fn cases(ids: &[&str]) -> Vec<CaseSpec> {
        ids.iter().map(|id| CaseSpec::new(*id, format!("user for {id}"))).collect()
    }

    fn models(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn full_product_in_prompt_case_model_order() {
        let trials = expand_matrix(
            &prompts(&["p1", "p2"]),
            &cases(&["c1", "c2", "c3"]),
            &models(&["m1", "m2"]),
        )
        .expect("non-empty inputs");

        assert_eq!(trials.len(), 2 * 3 * 2);
        let triples: Vec<(String, String, String)> = trials
            .iter()
            .map(|t| (t.prompt.id.clone(), t.case.id.clone(), t.model.clone()))
            .collect();
        assert_eq!(triples[0], ("p1".into(), "c1".into(), "m1".into()));
        assert_eq!(triples[1], ("p1".into(), "c1".into(), "m2".into()));
        assert_eq!(triples[2], ("p1".into(), "c2".into(), "m1".into()));
        assert_eq!(triples[6], ("p2".into(), "c1".into(), "m1".into()));
        assert_eq!(triples[11], ("p2".into(), "c3".into(), "m2".into()));
    }

    #[test]
    fn expansion_is_reproducible() {
        let p = prompts(&["a", "b"]);
        let c = cases(&["x"]);
        let m = models(&["m1", "m2"]);
        let first = expand_matrix(&p, &c, &m).expect("valid");
        let second = expand_matrix(&p, &c, &m).expect("valid");
        let ids = |ts: &[TrialSpec]| {
            ts.iter()
                .map(|t| format!("{}/{}/{}", t.prompt.id, t.case.id, t.model))
                .collect::<Vec<_>>()
        };
        assert_eq!(ids(&first), ids(&second));
    }

    #[test]
    fn empty_lists_are_configuration_errors() {
        let p = prompts(&["p"]);
        let c = cases(&["c"]);
        let m = models(&["m"]);

        assert!(matches!(
            expand_matrix(&[], &c, &m),
            Err(EngineError::Config(_))
        ));
        assert!(matches!(
            expand_matrix(&p, &[], &m),
            Err(EngineError::Config(_))
        ));
        assert!(matches!(
            expand_matrix(&p, &c, &[]),
            Err(EngineError::Config(_))
        ));
    }
}
