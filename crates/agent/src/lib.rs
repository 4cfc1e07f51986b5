//! Agent runtime around the cognitive gate.
//!
//! Each conversation owns one [`alma_core::CognitiveGate`]. Per turn the runtime:
//! 1. **Frustration** (`conversation`) - blends lexical cues into the running level
//! 2. **Gate** - context, risk and persona via `alma-core`
//! 3. **Guardrails** (`guardrails`) - halted turns deny every dispatch
//! 4. **Execution** (`tools`) - deploy/destroy/reconfigure executors
//!
//! Nothing side-effecting runs on a turn that returned the safety override.

pub mod conversation;
pub mod guardrails;
pub mod runtime;
pub mod tools;
