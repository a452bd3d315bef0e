use serde::{Deserialize, Serialize};

use crate::validate::{CompilerError, ERR_INVALID_OPTIONS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Generate {
    #[default]
    Dom,
    Ssr,
}

/// Options recognized by one compile invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompileOptions {
    /// Module the runtime helpers are imported from.
    pub module_name: String,
    pub generate: Generate,
    /// Emit hydration keys, markers and hydration-aware clone lookups.
    pub hydratable: bool,
    /// Streaming SSR: conditionals get memoized and member/call access stays reactive.
    #[serde(rename = "async")]
    pub is_async: bool,
    pub delegate_events: bool,
    pub non_delegate_events: Vec<String>,
    /// Extra event names delegated on top of the built-in list.
    pub delegated_events: Vec<String>,
    /// Tag names always compiled as components and imported from `module_name`.
    pub built_ins: Vec<String>,
    pub wrap_conditionals: bool,
    pub wrap_spreads: bool,
    pub context_to_custom_elements: bool,
    /// When set, only these delegated events mark an element as needing hydration replay.
    pub hydratable_events: Option<Vec<String>>,
    pub static_marker: String,
    pub effect_wrapper: String,
    pub memo_wrapper: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            module_name: "solid-js/web".to_string(),
            generate: Generate::Dom,
            hydratable: false,
            is_async: false,
            delegate_events: true,
            non_delegate_events: vec![],
            delegated_events: vec![],
            built_ins: vec![],
            wrap_conditionals: true,
            wrap_spreads: false,
            context_to_custom_elements: false,
            hydratable_events: None,
            static_marker: "@once".to_string(),
            effect_wrapper: "effect".to_string(),
            memo_wrapper: "memo".to_string(),
        }
    }
}

impl CompileOptions {
    pub fn ssr() -> Self {
        CompileOptions {
            generate: Generate::Ssr,
            ..Default::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, CompilerError> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(json).map_err(|e| {
            CompilerError::new(
                ERR_INVALID_OPTIONS,
                &format!("Invalid compile options: {}", e),
                "<options>",
                e.line() as u32,
                e.column() as u32,
            )
        })
    }

    pub fn is_ssr(&self) -> bool {
        self.generate == Generate::Ssr
    }

    /// Reactive conditions are memoized unless disabled; server rendering
    /// only reads them more than once when streaming.
    pub fn memoizes_conditions(&self) -> bool {
        self.wrap_conditionals && (!self.is_ssr() || self.is_async)
    }

    pub fn is_built_in(&self, tag: &str) -> bool {
        self.built_ins.iter().any(|b| b == tag)
    }
}
