//! Declaration and check macros.
//!
//! Every check macro takes the fixture first and records its own source
//! location and the literal text of the checked expressions.

/// Location of the macro invocation.
#[macro_export]
macro_rules! here {
    () => {
        $crate::Location::new(file!(), line!())
    };
}

/// Declare a suite. The body runs once at bind time with a
/// [`SuiteBuilder`](crate::SuiteBuilder) and declares proofs on it.
///
/// ```ignore
/// utest::model!("Math", |suite| {
///     suite.ensure("adds", |fx| {
///         utest::check_eq!(fx, 1 + 1, 2);
///         Ok(())
///     });
/// });
/// ```
///
/// Several `model!` blocks may share a suite name; their proofs are
/// appended in source order (file, then line, then column).
#[macro_export]
macro_rules! model {
    ($name:expr, |$suite:ident| $body:block) => {
        const _: () = {
            fn __utest_model_body($suite: &mut $crate::SuiteBuilder<'_>) $body

            $crate::__private::inventory::submit! {
                $crate::SuiteRegistration::new($name, __utest_model_body)
                    .at(file!(), line!(), column!())
            }
        };
    };
}

/// Record a failure unless the condition holds.
#[macro_export]
macro_rules! check {
    ($fx:expr, $cond:expr $(,)?) => {
        $fx.assert_true(
            $cond,
            $crate::here!(),
            stringify!($cond),
            $crate::Reporting::Record,
        )
    };
}

/// Record a failure unless `actual` equals `expected` under
/// [`ProofEq`](crate::ProofEq).
#[macro_export]
macro_rules! check_eq {
    ($fx:expr, $actual:expr, $expected:expr $(,)?) => {
        $fx.assert_eq(
            &$actual,
            &$expected,
            $crate::here!(),
            stringify!($actual),
            stringify!($expected),
            $crate::Reporting::Record,
        )
    };
}

/// Record a failure if the `Result` expression is an `Err` or panics.
#[macro_export]
macro_rules! check_no_throw {
    ($fx:expr, $body:expr $(,)?) => {
        $fx.assert_no_throw(|| $body, $crate::here!(), $crate::Reporting::Record)
    };
}

/// Record a failure unless the `Result` expression fails with exactly
/// error type `$kind`.
#[macro_export]
macro_rules! check_throw {
    ($fx:expr, $kind:ty, $body:expr $(,)?) => {
        $fx.assert_throw::<$kind, _, _>(
            || $body,
            $crate::here!(),
            stringify!($kind),
            $crate::Reporting::Record,
        )
    };
}

/// [`check!`] polled every 25 ms until `timeout` runs out.
#[macro_export]
macro_rules! try_check {
    ($fx:expr, $cond:expr, $timeout:expr $(,)?) => {{
        let fx = &$fx;
        fx.retry_check($timeout, |reporting| {
            fx.assert_true($cond, $crate::here!(), stringify!($cond), reporting)
        })
    }};
}

/// Operands are re-evaluated on every attempt and compared by reference.
#[macro_export]
macro_rules! try_check_eq {
    ($fx:expr, $actual:expr, $expected:expr, $timeout:expr $(,)?) => {{
        let fx = &$fx;
        fx.retry_check($timeout, |reporting| {
            fx.assert_eq(
                &$actual,
                &$expected,
                $crate::here!(),
                stringify!($actual),
                stringify!($expected),
                reporting,
            )
        })
    }};
}

#[macro_export]
macro_rules! try_check_no_throw {
    ($fx:expr, $body:expr, $timeout:expr $(,)?) => {{
        let fx = &$fx;
        fx.retry_check($timeout, |reporting| {
            fx.assert_no_throw(|| $body, $crate::here!(), reporting)
        })
    }};
}

#[macro_export]
macro_rules! try_check_throw {
    ($fx:expr, $kind:ty, $body:expr, $timeout:expr $(,)?) => {{
        let fx = &$fx;
        fx.retry_check($timeout, |reporting| {
            fx.assert_throw::<$kind, _, _>(
                || $body,
                $crate::here!(),
                stringify!($kind),
                reporting,
            )
        })
    }};
}
