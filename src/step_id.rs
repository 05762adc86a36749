//! Stable, human-legible identifiers for plan steps.
//!
//! A step's ID is derived from its position and its action text, never from
//! a database key, so a retried or resumed step can be matched back to the
//! progress recorded under that ID.
//!
//! ```rust
//! use tideline::step_id::{ensure_step_ids, generate_step_id, PlanStep};
//!
//! assert_eq!(
//!     generate_step_id(0, "Search for background information"),
//!     "step_0_search-for-background-information"
//! );
//!
//! let plan = vec![
//!     PlanStep::new("Define the scope"),
//!     PlanStep::new("Define the scope").with_id("kept-as-is"),
//! ];
//! let plan = ensure_step_ids(plan);
//! assert_eq!(plan[0].id.as_deref(), Some("step_0_define-the-scope"));
//! assert_eq!(plan[1].id.as_deref(), Some("kept-as-is"));
//! ```

const FALLBACK_SLUG: &str = "unknown";

/// URL-safe slug of `text`.
///
/// Lowercases and trims, drops everything except ASCII letters, digits,
/// underscores, whitespace and hyphens, turns runs of whitespace, underscores
/// and hyphens into a single hyphen, and trims hyphens from both ends.
///
/// Empty input yields `"unknown"`. Non-empty text with nothing sluggable in
/// it (`"!!!"`) yields an empty slug, keeping IDs such as `step_0_` that
/// earlier plans may already have persisted.
pub fn slugify(text: &str) -> String {
    if text.is_empty() {
        return FALLBACK_SLUG.to_string();
    }

    let lowered = text.trim().to_lowercase();
    let mut slug = String::with_capacity(lowered.len());

    for c in lowered.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if c.is_whitespace() || c == '_' || c == '-' {
            if !slug.ends_with('-') {
                slug.push('-');
            }
        }
    }

    slug.trim_matches('-').to_string()
}

/// `step_<index>_<slug>` for the step at `index` with `action` text.
pub fn generate_step_id(index: usize, action: &str) -> String {
    format!("step_{}_{}", index, slugify(action))
}

/// A plan item that can carry an ID.
pub trait StepLike {
    /// The current ID, if any.
    fn id(&self) -> Option<&str>;

    /// Assign an ID.
    fn set_id(&mut self, id: String);

    /// The step's action text.
    fn action(&self) -> Option<&str>;

    /// The step's reasoning text; used when there is no action.
    fn thought(&self) -> Option<&str> {
        None
    }
}

/// Give every step an ID, keeping IDs that are already set.
///
/// Steps with a non-empty ID pass through untouched, so re-planning never
/// renames a step that may already have started. The rest get
/// `generate_step_id(index, action ?? thought ?? "")`. Running this on its
/// own output changes nothing.
pub fn ensure_step_ids<S, I>(steps: I) -> Vec<S>
where
    S: StepLike,
    I: IntoIterator<Item = S>,
{
    steps
        .into_iter()
        .enumerate()
        .map(|(index, mut step)| {
            if step.id().is_some_and(|id| !id.is_empty()) {
                return step;
            }
            let id = generate_step_id(index, step.action().or(step.thought()).unwrap_or(""));
            step.set_id(id);
            step
        })
        .collect()
}

/// One item of a research plan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PlanStep {
    /// Stable identifier.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub id: Option<String>,
    /// 1-based step number as written by the planner.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub step: Option<u32>,
    /// What the step does.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub action: Option<String>,
    /// Why the step exists.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub thought: Option<String>,
    /// What the step should produce.
    #[cfg_attr(
        feature = "serde",
        serde(alias = "expectedOutput", skip_serializing_if = "Option::is_none")
    )]
    pub expected_output: Option<String>,
    /// Whether the step needs fresh external data.
    #[cfg_attr(feature = "serde", serde(alias = "requiresSearch"))]
    pub requires_search: bool,
}

impl PlanStep {
    /// A step with only an action.
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: Some(action.into()),
            ..Self::default()
        }
    }

    /// Set the ID.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the reasoning text.
    pub fn with_thought(mut self, thought: impl Into<String>) -> Self {
        self.thought = Some(thought.into());
        self
    }
}

impl StepLike for PlanStep {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }

    fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    fn thought(&self) -> Option<&str> {
        self.thought.as_deref()
    }
}

/// [`ensure_step_ids`] over untyped plan JSON.
///
/// A non-array `plan` yields an empty list. Objects with a truthy `id` are
/// returned as they are; other objects get an `id` from their `action` (or
/// `thought`). A bare string item is treated as the action of a new object.
#[cfg(feature = "json")]
pub fn ensure_step_ids_json(plan: &serde_json::Value) -> Vec<serde_json::Value> {
    use serde_json::Value;

    fn label(value: Option<&Value>) -> Option<String> {
        match value {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        }
    }

    fn truthy(value: Option<&Value>) -> bool {
        match value {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
            Some(Value::Array(_)) | Some(Value::Object(_)) => true,
        }
    }

    let Some(items) = plan.as_array() else {
        return Vec::new();
    };

    items
        .iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(fields) if truthy(fields.get("id")) => item.clone(),
            Value::Object(fields) => {
                let text = label(fields.get("action"))
                    .or_else(|| label(fields.get("thought")))
                    .unwrap_or_default();
                let mut fields = fields.clone();
                fields.insert("id".to_string(), Value::String(generate_step_id(index, &text)));
                Value::Object(fields)
            }
            Value::String(action) => serde_json::json!({
                "id": generate_step_id(index, action),
                "action": action,
            }),
            _ => serde_json::json!({ "id": generate_step_id(index, "") }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_basic() {
        assert_eq!(
            slugify("Search for background information"),
            "search-for-background-information"
        );
    }

    #[test]
    fn slugify_strips_punctuation_and_collapses_separators() {
        assert_eq!(slugify("  Compare: A vs. B!  "), "compare-a-vs-b");
        assert_eq!(slugify("snake_case__words"), "snake-case-words");
        assert_eq!(slugify("a - b -- c"), "a-b-c");
        assert_eq!(slugify("--edges--"), "edges");
        assert_eq!(slugify("tabs\tand\nnewlines"), "tabs-and-newlines");
    }

    #[test]
    fn slugify_drops_non_ascii() {
        assert_eq!(slugify("Café résumé"), "caf-rsum");
        assert_eq!(slugify("研究 step 2"), "step-2");
    }

    #[test]
    fn slugify_empty_input_falls_back() {
        assert_eq!(slugify(""), "unknown");
        assert_eq!(generate_step_id(3, ""), "step_3_unknown");
    }

    #[test]
    fn slugify_unsluggable_text_is_empty() {
        assert_eq!(slugify("   "), "");
        assert_eq!(slugify("!!!"), "");
        assert_eq!(slugify("研究"), "");
        assert_eq!(generate_step_id(0, "!!!"), "step_0_");
    }

    #[test]
    fn generate_step_id_is_stable() {
        let a = generate_step_id(0, "Search for background information");
        let b = generate_step_id(0, "Search for background information");
        assert_eq!(a, "step_0_search-for-background-information");
        assert_eq!(a, b);
    }

    #[test]
    fn generate_step_id_distinguishes_indices() {
        assert_eq!(generate_step_id(0, "Same text"), "step_0_same-text");
        assert_eq!(generate_step_id(1, "Same text"), "step_1_same-text");
        assert_eq!(generate_step_id(3, ""), "step_3_unknown");
    }

    #[test]
    fn ensure_step_ids_assigns_missing_ids() {
        let plan = vec![
            PlanStep::new("Define scope"),
            PlanStep::default().with_thought("Why this matters"),
            PlanStep::default(),
        ];
        let plan = ensure_step_ids(plan);
        assert_eq!(plan[0].id.as_deref(), Some("step_0_define-scope"));
        assert_eq!(plan[1].id.as_deref(), Some("step_1_why-this-matters"));
        assert_eq!(plan[2].id.as_deref(), Some("step_2_unknown"));
    }

    #[test]
    fn ensure_step_ids_prefers_action_over_thought() {
        let plan = ensure_step_ids(vec![PlanStep::new("Act").with_thought("Think")]);
        assert_eq!(plan[0].id.as_deref(), Some("step_0_act"));
    }

    #[test]
    fn ensure_step_ids_keeps_existing_ids() {
        let plan = ensure_step_ids(vec![
            PlanStep::new("Renamed action").with_id("step_0_original-action"),
            PlanStep::new("Fresh"),
        ]);
        assert_eq!(plan[0].id.as_deref(), Some("step_0_original-action"));
        assert_eq!(plan[1].id.as_deref(), Some("step_1_fresh"));
    }

    #[test]
    fn ensure_step_ids_replaces_empty_ids() {
        let plan = ensure_step_ids(vec![PlanStep::new("Fresh").with_id("")]);
        assert_eq!(plan[0].id.as_deref(), Some("step_0_fresh"));
    }

    #[test]
    fn ensure_step_ids_is_idempotent() {
        let once = ensure_step_ids(vec![PlanStep::new("One"), PlanStep::new("Two")]);
        let twice = ensure_step_ids(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn ensure_step_ids_empty_plan() {
        let plan: Vec<PlanStep> = ensure_step_ids(Vec::new());
        assert!(plan.is_empty());
    }

    #[cfg(feature = "json")]
    mod json {
        use super::*;
        use serde_json::json;

        #[test]
        fn non_array_yields_empty() {
            assert!(ensure_step_ids_json(&json!({"plan": []})).is_empty());
            assert!(ensure_step_ids_json(&json!(null)).is_empty());
            assert!(ensure_step_ids_json(&json!("step")).is_empty());
        }

        #[test]
        fn objects_get_ids_and_keep_other_fields() {
            let plan = json!([
                {"step": 1, "action": "Gather sources", "requires_search": true},
                {"id": "custom", "action": "Ignored"},
                {"thought": "Only a thought"},
                {"id": "", "action": "Empty id"},
            ]);
            let out = ensure_step_ids_json(&plan);
            assert_eq!(out[0]["id"], "step_0_gather-sources");
            assert_eq!(out[0]["requires_search"], true);
            assert_eq!(out[1]["id"], "custom");
            assert_eq!(out[2]["id"], "step_2_only-a-thought");
            assert_eq!(out[3]["id"], "step_3_empty-id");
        }

        #[test]
        fn json_pass_is_idempotent() {
            let plan = json!([{"action": "A"}, {"action": "B"}]);
            let once = serde_json::Value::Array(ensure_step_ids_json(&plan));
            let twice = serde_json::Value::Array(ensure_step_ids_json(&once));
            assert_eq!(once, twice);
        }

        #[test]
        fn plan_step_reads_planner_json() {
            let step: PlanStep = serde_json::from_value(json!({
                "step": 2,
                "action": "Compare approaches",
                "expectedOutput": "a table",
                "requiresSearch": true
            }))
            .unwrap();
            assert_eq!(step.step, Some(2));
            assert_eq!(step.expected_output.as_deref(), Some("a table"));
            assert!(step.requires_search);
        }
    }
}
