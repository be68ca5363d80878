//! qsel rule/fact layer.
//!
//! Translates structured catalog knowledge (QPU specs, implementation
//! links, SDK requirements) into declarative facts for an external logic
//! evaluator, and assembles ad-hoc queries against user-supplied rules.
//!
//! The crate deliberately never interprets rule *semantics*; rules are
//! opaque text evaluated elsewhere. It only parses rule *signatures*:
//! which parameters the head declares, which of them are variables, and
//! how to bind values into them positionally.
//!
//! # Fact vocabulary
//!
//! | Predicate | Arguments | Emitted for |
//! |-----------|-----------|-------------|
//! | `provides_qubits` | device, count | every QPU |
//! | `t1_time` | device, µs | every QPU |
//! | `max_gate_time` | device, µs | every QPU |
//! | `has_provider` | device, provider | every QPU |
//! | `is_simulator` | device | simulator QPUs |
//! | `implements` | implementation, algorithm | every implementation |
//! | `required_sdk` | implementation, sdk | every implementation |

mod error;
mod evaluator;
mod knowledge;
mod signature;
mod store;

pub use error::{FactError, FactResult};
pub use evaluator::RuleEvaluator;
pub use knowledge::KnowledgeBase;
pub use signature::{assemble_query, extract_variables};
pub use store::{Fact, FactGroup, FactKey, FactStore, MemoryFactStore};
