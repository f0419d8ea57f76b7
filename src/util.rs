/// Asserts that a numerical value is in the provided interval `[a,b]` and panics
/// with a helpful message if not
///
/// ### Example
/// ```should_panic
/// # use coinbag_td::assert_interval;
/// let alpha = 2.0;
/// assert_interval!(alpha, 0.0, 1.0);
/// ```
/// This will panic with the message "Invalid value for \`alpha\`. Must be in the interval \[0, 1\]."
#[macro_export]
macro_rules! assert_interval {
    ($var:expr, $a:expr, $b:expr) => {
        assert!(
            $var >= $a && $var <= $b,
            "Invalid value for `{}`. Must be in the interval [{}, {}].",
            stringify!($var),
            $a,
            $b,
        );
    };
}

/// Asserts that a numerical value is finite and not below `min`
#[macro_export]
macro_rules! assert_at_least {
    ($var:expr, $min:expr) => {
        assert!(
            $var.is_finite() && $var >= $min,
            "Invalid value for `{}`. Must be finite and at least {}.",
            stringify!($var),
            $min,
        );
    };
}

/// Maximum of a sequence of floats, `None` if the sequence is empty
pub(crate) fn max_f64(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    values.into_iter().fold(None, |acc, v| match acc {
        Some(m) if m >= v => Some(m),
        _ => Some(v),
    })
}
