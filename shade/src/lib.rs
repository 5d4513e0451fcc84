//! Shade: a non-fungible token ledger whose ownership records hold hash
//! commitments instead of raw identities.
//!
//! This crate re-exports all the components of the Shade system.

pub use shade_commitment::*;
pub use shade_core::*;
pub use shade_ledger::*;
pub use shade_runtime::*;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_registry_driven_session() {
        let shared = [0x42; 32];
        let alice = PublicIdentity::from_signing_seed(&[1; 32]);
        let bob = PublicIdentity::from_signing_seed(&[2; 32]);

        let mut registry = WitnessRegistry::new();
        registry.register(alice, Arc::new(SeededWitness::new(&[1; 32], &shared)));
        registry.register(bob, Arc::new(SeededWitness::new(&[2; 32], &shared)));

        let config = RuntimeConfig {
            commitment: CommitmentKind::Blake3,
            ..RuntimeConfig::default()
        };
        let mut runtime = ShadeRuntime::from_config(&config).unwrap();
        let token = TokenId::new(9);

        let alice_witness = registry.witness_for(&alice).unwrap();
        let bob_witness = registry.witness_for(&bob).unwrap();

        runtime.mint(&alice, alice_witness.as_ref(), &alice, token).unwrap();
        runtime.transfer(&alice, alice_witness.as_ref(), &bob, token).unwrap();

        // Bob received the token under his shared-secret key
        let owner = runtime.owner_of(token).unwrap();
        runtime
            .transfer_from(&bob, bob_witness.as_ref(), &owner, &alice, token)
            .unwrap();

        assert_eq!(runtime.balance_of(&bob, bob_witness.as_ref(), &alice).unwrap(), 1);
        assert_eq!(runtime.balance_of(&bob, bob_witness.as_ref(), &bob).unwrap(), 0);
        runtime.snapshot().verify_invariants().unwrap();
    }
}
