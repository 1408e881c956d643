use nalgebra::{DVector, Scalar};
use std::thread;

/// Poor man's approx assertion for matrices
#[macro_export]
macro_rules! assert_approx_matrix_eq {
    ($x:expr, $y:expr, abstol = $tol:expr) => {{
        let diff = $x - $y;

        let max_absdiff = diff.abs().max();
        let approx_eq = max_absdiff <= $tol;

        if !approx_eq {
            println!("abstol: {:e}", $tol);
            println!("left: {}", $x);
            println!("right: {}", $y);
            println!("diff: {:e}", diff);
        }
        assert!(approx_eq);
    }};
}

#[macro_export]
macro_rules! assert_panics {
    ($e:expr) => {{
        use std::panic::catch_unwind;
        use std::stringify;
        let expr_string = stringify!($e);
        let result = catch_unwind(|| $e);
        if result.is_ok() {
            panic!("assert_panics!({}) failed.", expr_string);
        }
    }};
}

/// Runs `f(rank)` on `num_ranks` scoped threads and collects the results in rank order.
///
/// Panics in any of the threads are propagated to the caller.
pub fn run_concurrently<R, F>(num_ranks: usize, f: F) -> Vec<R>
where
    R: Send,
    F: Fn(usize) -> R + Sync,
{
    thread::scope(|scope| {
        let f = &f;
        let handles: Vec<_> = (0..num_ranks)
            .map(|rank| scope.spawn(move || f(rank)))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("Thread panicked"))
            .collect()
    })
}

/// Splits `values` into `num_parts` vectors of the same length where part `k` keeps the
/// entries `i` with `owner(i) == k` and zeros elsewhere.
pub fn scatter_by_owner<T: Scalar + num::Zero>(
    values: &DVector<T>,
    num_parts: usize,
    owner: impl Fn(usize) -> usize,
) -> Vec<DVector<T>> {
    let mut parts = vec![DVector::zeros(values.len()); num_parts];
    for (i, v) in values.iter().enumerate() {
        parts[owner(i)][i] = v.clone();
    }
    parts
}
