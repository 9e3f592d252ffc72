//! Opt-in tracing for the reader, tokenizer and token stream.
//!
//! Mirrors the teacher crate's `Log<T>` verbosity ladder: a caller picks how
//! much chatter they want, and the trace calls themselves compile away
//! entirely outside `debug_assertions` builds so release binaries pay
//! nothing for them.

use std::fmt::{Debug, Display, Formatter};

use crate::error::Position;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
/// Verbosity levels for diagnostic tracing, ordered low to high.
pub enum Log<T> {
    None,
    Default(T),
    Success(T),
    Result(T),
    Verbose(T),
}

impl<T> Default for Log<T> {
    fn default() -> Self {
        Log::None
    }
}

impl<T: Display> Display for Log<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Log::None => Ok(()),
            Log::Default(s) | Log::Success(s) | Log::Result(s) | Log::Verbose(s) => {
                write!(f, "{}", s)
            }
        }
    }
}

impl<T> Log<T> {
    /// Relative rank used to decide whether a trace call should fire.
    pub fn order(&self) -> u8 {
        match self {
            Log::None => 0,
            Log::Default(_) => 1,
            Log::Success(_) => 2,
            Log::Result(_) => 3,
            Log::Verbose(_) => 4,
        }
    }
}

impl<TL: Display> Log<TL> {
    /// Trace a successfully produced token at `position`.
    pub fn trace_token<T: Debug>(&self, position: Position, token: &T) {
        #[cfg(debug_assertions)]
        if self.order() >= Log::Success(()).order() {
            println!("[{}; token]: {:?} at {}", self, token, position);
        }
    }

    /// Trace reaching end of input at `position`.
    pub fn trace_eof(&self, position: Position) {
        #[cfg(debug_assertions)]
        if self.order() >= Log::Result(()).order() {
            println!("[{}; eof]: at {}", self, position);
        }
    }

    /// Trace an arbitrary verbose-level message, lazily formatted.
    pub fn trace_verbose(&self, message: impl FnOnce() -> String) {
        #[cfg(debug_assertions)]
        if self.order() >= Log::Verbose(()).order() {
            println!("[{}; verbose]: {}", self, message());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_is_monotonic_with_verbosity() {
        assert!(Log::None::<()>.order() < Log::Default(()).order());
        assert!(Log::Default(()).order() < Log::Success(()).order());
        assert!(Log::Success(()).order() < Log::Result(()).order());
        assert!(Log::Result(()).order() < Log::Verbose(()).order());
    }
}
