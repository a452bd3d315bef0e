//! # JSX Compiler
//!
//! Compiles JSX in JavaScript/TypeScript modules into fine-grained reactive
//! DOM code, or into string-building code for server rendering.
//!
//! ## Pipeline
//!
//! 1. **Parse** (`parse`): oxc parses the module; every outermost JSX node is
//!    converted into the host-independent `JsxNode` tree (`ir`).
//! 2. **Transform** (`transform`): each node is compiled into a
//!    `CompileResult` by the DOM (`dom`, `template`) or SSR (`ssr`) backend.
//!    Components (`component`) and conditional expressions (`condition`) are
//!    shared by both.
//! 3. **Print** (`codegen`): the replacement expression is printed and spliced
//!    over the original JSX.
//! 4. **Finalize** (`finalize`): helper imports, hoisted templates and the
//!    delegated event registration are added around the module body.
//!
//! ## Module State
//!
//! All per-module state (templates, helper imports, delegated events, fresh
//! identifiers) lives in a `CompileContext` created for exactly one module.
//! Modules compile independently, so `compile_modules` runs them in parallel.

#[cfg(feature = "napi")]
use napi_derive::napi;

mod attributes;
mod codegen;
mod component;
mod condition;
mod config;
mod constants;
mod context;
mod dom;
mod escape;
mod finalize;
mod ir;
mod normalize;
mod parse;
mod scope;
mod ssr;
mod static_eval;
mod template;
mod transform;
mod validate;
mod visitor;

#[cfg(test)]
mod dom_tests;

pub use config::{CompileOptions, Generate};
pub use parse::{compile_module, compile_modules, ModuleOutput, SourceFile};
pub use validate::*;

/// Node entry point: options and result travel as JSON.
#[cfg(feature = "napi")]
#[napi]
pub fn transform_jsx_native(
    code: String,
    filename: String,
    options_json: Option<String>,
) -> napi::Result<serde_json::Value> {
    let to_napi = |err: CompilerError| {
        let reason = serde_json::to_string(&err).unwrap_or_else(|_| err.to_string());
        napi::Error::from_reason(reason)
    };
    let options = CompileOptions::from_json(options_json.as_deref().unwrap_or_default())
        .map_err(to_napi)?;
    let output = compile_module(&code, &filename, &options).map_err(to_napi)?;
    serde_json::to_value(output).map_err(|e| napi::Error::from_reason(e.to_string()))
}
