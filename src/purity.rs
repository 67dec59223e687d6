//! Oracle deciding whether a called method is free of heap side effects.
//!
//! The list of pure methods ships with the crate and is parsed once, on first use.

use std::collections::HashSet;
use std::sync::OnceLock;

use log::debug;

const PURE_METHODS_LIST: &str = include_str!("../resources/pure_methods.txt");

static PURE_METHODS: OnceLock<HashSet<String>> = OnceLock::new();

fn parse(list: &str) -> HashSet<String> {
    list.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| format!("<{}>", line))
        .collect()
}

/// Signatures of all known pure methods, e.g. `<java.lang.Math: int abs(int)>`.
pub fn pure_methods() -> &'static HashSet<String> {
    PURE_METHODS.get_or_init(|| {
        let methods = parse(PURE_METHODS_LIST);
        debug!("loaded {} pure method signatures", methods.len());
        methods
    })
}

pub fn is_pure_method(signature: &str) -> bool {
    pure_methods().contains(signature)
}
