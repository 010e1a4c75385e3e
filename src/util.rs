#[cfg(any(test, feature = "tracing", loom))]
macro_rules! trace {
    ($($t:tt)*) => { tracing::trace!($($t)*) }
}

#[cfg(not(any(test, feature = "tracing", loom)))]
macro_rules! trace {
    ($($t:tt)*) => {};
}

macro_rules! feature {
    (
        #![$meta:meta]
        $($item:item)*
    ) => {
        $(
            #[cfg($meta)]
            #[cfg_attr(docsrs, doc(cfg($meta)))]
            $item
        )*
    }
}

macro_rules! loom_const_fn {
    (
        $(#[$meta:meta])*
        $vis:vis fn $name:ident($($arg:ident: $T:ty),*) -> $Ret:ty $body:block
    ) => {
        $(#[$meta])*
        #[cfg(not(loom))]
        $vis const fn $name($($arg: $T),*) -> $Ret $body

        $(#[$meta])*
        #[cfg(loom)]
        $vis fn $name($($arg: $T),*) -> $Ret $body
    };
}

/// Indicates code that is unreachable unless an operation state was misused.
///
/// In debug builds and tests, this panics. In release builds, it expands to
/// `unreachable_unchecked`, so it must only guard states that correct use of
/// the protocol can never reach.
macro_rules! unreachable_unchecked {
    ($msg:expr) => ({
        #[cfg(any(test, debug_assertions))]
        panic!(
            concat!(
                env!("CARGO_PKG_NAME"),
                " internal error: entered unreachable code: ",
                $msg,
                "\n/!\\ in release mode, this would have been `unreachable_unchecked`!"
            )
        );
        #[allow(unreachable_code)]
        {
            core::hint::unreachable_unchecked()
        }
    });
}

pub(crate) mod fmt;

#[cfg(all(test, not(loom)))]
pub(crate) use self::test::trace_init;
