#![allow(dead_code)]

pub mod fbx;
pub mod test_utils;

/// Asserts two matrices are equal within `eps`, element by element.
pub fn assert_matrix_eq(actual: cgmath::Matrix4<f32>, expected: cgmath::Matrix4<f32>, eps: f32) {
    let actual: &[f32; 16] = actual.as_ref();
    let expected: &[f32; 16] = expected.as_ref();
    for (idx, (a, e)) in actual.iter().zip(expected.iter()).enumerate() {
        assert!(
            (a - e).abs() <= eps,
            "matrix element {} differs: {} vs {}\nactual: {:?}\nexpected: {:?}",
            idx,
            a,
            e,
            actual,
            expected
        );
    }
}
