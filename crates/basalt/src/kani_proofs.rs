//! Kani proofs for the combining algorithms
//!
//! Bounded model checking over every sequence of up to four child
//! decisions.
//!
//! Run with: `cargo kani --harness verify_*`

#[cfg(kani)]
use crate::combining::{CombiningAlgorithm, combine_decisions};
#[cfg(kani)]
use crate::decision::{Decision, IndeterminateKind};

#[cfg(kani)]
fn any_decision() -> Decision {
    match kani::any::<u8>() % 6 {
        0 => Decision::Permit,
        1 => Decision::Deny,
        2 => Decision::NotApplicable,
        3 => Decision::Indeterminate(IndeterminateKind::Permit),
        4 => Decision::Indeterminate(IndeterminateKind::Deny),
        _ => Decision::Indeterminate(IndeterminateKind::DenyPermit),
    }
}

#[cfg(kani)]
fn any_children() -> Vec<Decision> {
    let len: usize = kani::any();
    kani::assume(len <= 4);
    (0..len).map(|_| any_decision()).collect()
}

/// **Property**: deny-overrides returns Deny whenever a child denies, and
/// never Permit while a Deny-leaning Indeterminate child is present.
#[cfg(kani)]
#[kani::proof]
#[kani::unwind(6)]
fn verify_deny_overrides_safety() {
    let children = any_children();
    let result = combine_decisions(CombiningAlgorithm::DenyOverrides, &children);

    if children.contains(&Decision::Deny) {
        assert_eq!(result, Decision::Deny);
    }
    let deny_leaning = children.iter().any(|d| {
        matches!(
            d,
            Decision::Indeterminate(IndeterminateKind::Deny | IndeterminateKind::DenyPermit)
        )
    });
    if deny_leaning {
        assert_ne!(result, Decision::Permit);
    }
}

/// **Property**: permit-overrides mirrors deny-overrides with the effects
/// swapped.
#[cfg(kani)]
#[kani::proof]
#[kani::unwind(6)]
fn verify_permit_overrides_mirrors_deny_overrides() {
    let children = any_children();
    let mirrored: Vec<Decision> = children.iter().map(|d| mirror(*d)).collect();

    let permit = combine_decisions(CombiningAlgorithm::PermitOverrides, &children);
    let deny = combine_decisions(CombiningAlgorithm::DenyOverrides, &mirrored);
    assert_eq!(permit, mirror(deny));
}

/// **Property**: a combination of only NotApplicable children is
/// NotApplicable for every algorithm except the two unless algorithms,
/// which always decide.
#[cfg(kani)]
#[kani::proof]
#[kani::unwind(6)]
fn verify_not_applicable_is_neutral() {
    let len: usize = kani::any();
    kani::assume(len <= 4);
    let children = vec![Decision::NotApplicable; len];

    for algorithm in CombiningAlgorithm::ALL {
        let result = combine_decisions(algorithm, &children);
        match algorithm {
            CombiningAlgorithm::DenyUnlessPermit => assert_eq!(result, Decision::Deny),
            CombiningAlgorithm::PermitUnlessDeny => assert_eq!(result, Decision::Permit),
            _ => assert_eq!(result, Decision::NotApplicable),
        }
    }
}

#[cfg(kani)]
fn mirror(decision: Decision) -> Decision {
    match decision {
        Decision::Permit => Decision::Deny,
        Decision::Deny => Decision::Permit,
        Decision::NotApplicable => Decision::NotApplicable,
        Decision::Indeterminate(IndeterminateKind::Permit) => {
            Decision::Indeterminate(IndeterminateKind::Deny)
        }
        Decision::Indeterminate(IndeterminateKind::Deny) => {
            Decision::Indeterminate(IndeterminateKind::Permit)
        }
        Decision::Indeterminate(IndeterminateKind::DenyPermit) => {
            Decision::Indeterminate(IndeterminateKind::DenyPermit)
        }
    }
}
