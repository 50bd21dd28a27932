/// The largest `n` whose factorial is finite in an `f64`.
pub const MAX_FACTORIAL: i64 = 170;

/// Computes `n!` as an `f64`.
///
/// Returns `1.0` for any `n <= 1`, including negative `n`. Negative input is not
/// rejected; it simply produces an empty product. Above [`MAX_FACTORIAL`] the
/// result is `f64::INFINITY`.
pub fn factorial(n: i64) -> f64 {
    if n > MAX_FACTORIAL {
        return f64::INFINITY;
    }
    (2..=n).map(|k| k as f64).product()
}

/// Counts the ways of choosing `r` unordered items from `n`, as
/// `n! / (r! * (n - r)!)`.
///
/// This is deliberately the direct three-factorial form. It overflows once `n`
/// passes [`MAX_FACTORIAL`], and for `r > n` it returns a finite but meaningless
/// value because `(n - r)!` collapses to `1`.
pub fn combinations(n: i64, r: i64) -> f64 {
    factorial(n) / (factorial(r) * factorial(n.saturating_sub(r)))
}

/// Product of the consecutive integers in `[low, high_exclusive)`.
///
/// An empty range yields `1.0`. Stops as soon as the product reaches zero or
/// leaves the finite range, since no further factor can bring it back.
pub fn falling_product(low: i64, high_exclusive: i64) -> f64 {
    let mut product = 1.0;
    for x in low..high_exclusive {
        product *= x as f64;
        if product == 0.0 || !product.is_finite() {
            break;
        }
    }
    product
}
