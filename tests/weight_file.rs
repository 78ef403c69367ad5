//! Integration tests for the `.wts` text format.

use ndarray::{ArrayD, IxDyn};
use proptest::prelude::*;
use tnt_export::params::ParameterSet;
use tnt_export::serialization::wts::parse_weights;
use tnt_export::serialization::{encoded_len, write_weights, WriteOptions};

fn render(params: &ParameterSet) -> Vec<u8> {
    let mut out = Vec::new();
    write_weights(&mut out, params, WriteOptions::default()).unwrap();
    out
}

#[test]
fn test_two_element_entry_layout() {
    let mut params = ParameterSet::new();
    params.insert("w", ArrayD::from_shape_vec(IxDyn(&[2]), vec![1.0, -1.0]).unwrap());

    let out = render(&params);
    assert_eq!(String::from_utf8(out).unwrap(), "1\nw 2  3f800000 bf800000\n");
}

#[test]
fn test_matrix_is_flattened_row_major() {
    let mut params = ParameterSet::new();
    params.insert(
        "linear.weight",
        ArrayD::from_shape_vec(IxDyn(&[2, 2]), vec![1.0, 2.0, 3.0, 4.0]).unwrap(),
    );

    let text = String::from_utf8(render(&params)).unwrap();
    assert_eq!(
        text,
        "1\nlinear.weight 4  3f800000 40000000 40400000 40800000\n"
    );
}

proptest! {
    #[test]
    fn prop_parse_recovers_names_order_and_bits(
        entries in prop::collection::vec(
            ("[a-z][a-z0-9_.]{0,16}", prop::collection::vec(any::<u32>(), 0..24)),
            0..8,
        )
    ) {
        let mut params = ParameterSet::new();
        for (name, bits) in &entries {
            if params.contains(name) {
                continue;
            }
            let values: Vec<f32> = bits.iter().map(|&b| f32::from_bits(b)).collect();
            params.insert(name.as_str(), ArrayD::from_shape_vec(IxDyn(&[values.len()]), values).unwrap());
        }

        let out = render(&params);
        prop_assert_eq!(out.len(), encoded_len(&params));

        let parsed = parse_weights(out.as_slice()).unwrap();
        prop_assert_eq!(parsed.len(), params.len());
        for ((name, original), (parsed_name, parsed_tensor)) in params.iter().zip(parsed.iter()) {
            prop_assert_eq!(name, parsed_name);
            let expected: Vec<u32> = original.iter().map(|v| v.to_bits()).collect();
            let actual: Vec<u32> = parsed_tensor.iter().map(|v| v.to_bits()).collect();
            prop_assert_eq!(expected, actual);
        }
    }

    #[test]
    fn prop_every_token_is_eight_lowercase_hex_digits(bits in prop::collection::vec(any::<u32>(), 1..32)) {
        let values: Vec<f32> = bits.iter().map(|&b| f32::from_bits(b)).collect();
        let mut params = ParameterSet::new();
        params.insert("t", ArrayD::from_shape_vec(IxDyn(&[values.len()]), values).unwrap());

        let text = String::from_utf8(render(&params)).unwrap();
        let line = text.lines().nth(1).unwrap();
        let prefix = format!("t {} ", bits.len());
        prop_assert!(line.starts_with(&prefix));

        let tokens: Vec<&str> = line[prefix.len()..].split(' ').skip(1).collect();
        prop_assert_eq!(tokens.len(), bits.len());
        for (token, b) in tokens.iter().zip(&bits) {
            prop_assert_eq!(token.len(), 8);
            prop_assert!(token.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
            prop_assert_eq!(u32::from_str_radix(token, 16).unwrap(), *b);
        }
    }
}
