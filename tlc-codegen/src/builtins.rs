//! The whitelisted standard-library surface
//!
//! These are the names a program may reference without declaring them.
//! Values live directly on `stdlib` or on `stdlib.Math`; functions live
//! on `stdlib.Math` and have fixed arities. An `extern` declaration of
//! one of these names is a no-op: the builtin binding wins.

/// Classification of a builtin name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    /// A value on `stdlib` itself (`Infinity`, `NaN`)
    StdlibValue,

    /// A constant on `stdlib.Math` (`PI`, `E`, ...)
    MathValue,

    /// A function on `stdlib.Math` with a fixed arity
    MathFunction { arity: usize },
}

/// Look up a name in the builtin catalog
pub fn lookup(name: &str) -> Option<Builtin> {
    match name {
        "Infinity" | "NaN" => Some(Builtin::StdlibValue),

        "E" | "LN10" | "LN2" | "LOG2E" | "LOG10E" | "PI" | "SQRT1_2" | "SQRT2" => {
            Some(Builtin::MathValue)
        }

        "acos" | "asin" | "atan" | "cos" | "sin" | "tan" | "ceil" | "floor" | "exp" | "log"
        | "sqrt" | "abs" => Some(Builtin::MathFunction { arity: 1 }),

        "atan2" | "pow" => Some(Builtin::MathFunction { arity: 2 }),

        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_values() {
        assert_eq!(lookup("Infinity"), Some(Builtin::StdlibValue));
        assert_eq!(lookup("NaN"), Some(Builtin::StdlibValue));
        assert_eq!(lookup("PI"), Some(Builtin::MathValue));
        assert_eq!(lookup("SQRT1_2"), Some(Builtin::MathValue));
    }

    #[test]
    fn test_lookup_functions() {
        assert_eq!(lookup("sin"), Some(Builtin::MathFunction { arity: 1 }));
        assert_eq!(lookup("atan2"), Some(Builtin::MathFunction { arity: 2 }));
        assert_eq!(lookup("pow"), Some(Builtin::MathFunction { arity: 2 }));
    }

    #[test]
    fn test_lookup_unknown() {
        assert_eq!(lookup("putchar"), None);
        assert_eq!(lookup("fib"), None);
    }
}
