//! Validator behaviour on generated equations.

use proptest::prelude::*;
use tensure_einsum::{validate, Equation, EquationError};

fn term(name: char, idxs: &[char]) -> String {
    let list: Vec<String> = idxs.iter().map(ToString::to_string).collect();
    format!("{name}({})", list.join(","))
}

/// Operands with distinct indices each, output drawn from their union
fn well_formed() -> impl Strategy<Value = String> {
    proptest::collection::vec(
        proptest::sample::subsequence(vec!['i', 'j', 'k', 'l', 'm'], 0..=3),
        1..4,
    )
    .prop_flat_map(|operands| {
        let mut union: Vec<char> = operands.iter().flatten().copied().collect();
        union.sort_unstable();
        union.dedup();
        let len = union.len();
        (Just(operands), proptest::sample::subsequence(union, 0..=len))
    })
    .prop_map(|(operands, output)| {
        let rhs: Vec<String> = operands
            .iter()
            .enumerate()
            .map(|(n, idxs)| term(char::from(b'B' + n as u8), idxs))
            .collect();
        format!("{} = {}", term('A', &output), rhs.join(" * "))
    })
}

proptest! {
    #[test]
    fn well_formed_equations_validate(eq in well_formed()) {
        prop_assert!(validate(&eq).is_ok(), "{}", eq);
    }

    #[test]
    fn parse_display_parse_is_stable(eq in well_formed()) {
        let parsed = Equation::parse(&eq).unwrap();
        let again = Equation::parse(&parsed.to_string()).unwrap();
        prop_assert_eq!(parsed, again);
    }

    #[test]
    fn whitespace_is_insignificant(eq in well_formed()) {
        let spaced: String = eq.chars().flat_map(|c| [c, ' ']).collect();
        prop_assert_eq!(validate(&spaced), validate(&eq));
    }
}

#[test]
fn documented_examples() {
    assert!(validate("A(i,j)=B(i,k)*C(k,j)").is_ok());
    assert!(matches!(
        validate("A(i,j)=B(i,k)*C(k,j"),
        Err(EquationError::InvalidTensorSyntax { .. })
    ));
    assert!(matches!(
        validate("A(i,i)=B(i,k)*C(k,i)"),
        Err(EquationError::RepeatedOutputIndex { index: 'i' })
    ));
    assert!(matches!(
        validate("A(i,j)=B(i,k)"),
        Err(EquationError::UnboundOutputIndex { index: 'j' })
    ));
    assert!(matches!(
        validate("A()=B(i,i)"),
        Err(EquationError::RepeatedIndexInTensor { index: 'i', .. })
    ));
}
