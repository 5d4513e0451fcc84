pub mod config;
pub mod identity;
pub mod operations;
pub mod policy;
pub mod receipt;
pub mod runtime;
pub mod witness;

// Re-export the main types for convenience
pub use config::RuntimeConfig;
pub use identity::{CallContext, Identity, Role};
pub use operations::{Authority, Transition};
pub use policy::{ControllerPolicy, MintBurnPolicy, OpenPolicy, PolicyConfig};
pub use receipt::{OperationKind, OperationReceipt};
pub use runtime::ShadeRuntime;
pub use witness::{SeededWitness, StaticWitness, WitnessProvider, WitnessRegistry};
