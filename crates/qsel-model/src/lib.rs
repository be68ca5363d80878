//! qsel domain model.
//!
//! Plain value types shared by every other qsel crate: quantum circuits and
//! their static metrics, providers and their QPUs, compiler SDKs, algorithm
//! implementations with their declarative rules, and parameter bindings.
//!
//! None of these types carry behaviour beyond construction and small
//! accessors; the selection pipeline in `qsel-sched` and the rule layer in
//! `qsel-facts` own the logic.

mod circuit;
mod device;
mod implementation;

pub use circuit::{Circuit, CircuitId, CircuitLanguage};
pub use device::{Provider, ProviderId, Qpu, QpuId, Sdk, SdkId};
pub use implementation::{
    Implementation, ImplementationId, Parameter, ParameterBindings, ParameterType, ParameterValue,
    Rule,
};
