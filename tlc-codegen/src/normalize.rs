//! Signature Normalizer
//!
//! Fixes the calling convention of the emitted module: every user
//! function takes N double parameters and returns a double, unless its
//! body yields no value, in which case it returns nothing. Top-level
//! expression statements are sequenced into a synthesized entry
//! function whose name never collides with a user-defined name; the
//! export object always points at the synthesized entry.

use crate::resolve::{Annotations, CalleeKind};
use tlc_frontend::{Expression, ExpressionKind, Function, Program};

/// The normalized shape of the module to emit
#[derive(Debug)]
pub struct ModulePlan<'a> {
    /// Name of the synthesized entry function
    pub entry_name: String,

    /// User functions in declaration order
    pub functions: Vec<&'a Function>,

    /// Top-level expression statements in program order
    pub main_body: Vec<&'a Expression>,

    /// Whether the entry function returns the final statement's value.
    /// A trailing foreign call is side-effect-only and its result is
    /// discarded.
    pub main_returns: bool,
}

/// Normalize a resolved program into a module plan
pub fn normalize_program<'a>(program: &'a Program, annotations: &Annotations) -> ModulePlan<'a> {
    let functions: Vec<&Function> = program.functions().collect();
    let main_body: Vec<&Expression> = program.top_level_expressions().collect();

    let main_returns = match main_body.last() {
        None => false,
        Some(last) => {
            let discarded = matches!(last.kind, ExpressionKind::Call { .. })
                && annotations.callee_kind_of(last) == Some(CalleeKind::Foreign);
            !discarded && annotations.kind_of(last).is_some()
        }
    };

    // `$` cannot appear in a source identifier, so `$main` is already
    // collision-free; the loop guards the convention rather than any
    // reachable case.
    let mut entry_name = "$main".to_string();
    while annotations.callables.contains_key(&entry_name) {
        entry_name.insert(0, '$');
    }

    log::debug!(
        "module plan: {} function(s), {} entry statement(s), entry `{}`",
        functions.len(),
        main_body.len(),
        entry_name
    );

    ModulePlan {
        entry_name,
        functions,
        main_body,
        main_returns,
    }
}
