//! # Trial
//!
//! Module dedicated to trying an operation against several candidates
//! (keys, most of the time) while accumulating failures.
//!
//! A mailbox can hold several generations of keys and nothing tells
//! in advance which one unlocks a given ciphertext. Decrypting with an
//! unknown key, unlocking a key ring and resolving an address key
//! token all go through the helpers of this module.

use std::{error, fmt};

use tracing::debug;

use crate::error::chain;

/// Failures accumulated while trying candidates, in candidate order.
#[derive(Debug)]
pub struct Failures<E> {
    errors: Vec<E>,
}

impl<E> Failures<E> {
    /// Number of candidates that failed.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

}

impl<E: error::Error> Failures<E> {
    /// Joins every failure, with its chain of sources, on a single
    /// line.
    pub fn causes(&self) -> String {
        if self.errors.is_empty() {
            return String::from("no candidate to try");
        }

        self.errors
            .iter()
            .enumerate()
            .map(|(i, err)| format!("#{}: {}", i + 1, chain(err)))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl<E: error::Error> fmt::Display for Failures<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.causes())
    }
}

/// Runs `op` against each candidate in order and returns the first
/// success.
///
/// Candidates after the first success are not tried. Fails with every
/// accumulated error when no candidate succeeds, including when there
/// is no candidate at all.
pub fn first_success<C, T, E, I, F>(candidates: I, mut op: F) -> Result<T, Failures<E>>
where
    I: IntoIterator<Item = C>,
    F: FnMut(C) -> Result<T, E>,
    E: fmt::Debug,
{
    let mut errors = Vec::new();

    for candidate in candidates {
        match op(candidate) {
            Ok(out) => return Ok(out),
            Err(err) => {
                debug!(?err, "candidate #{} failed, trying next one", errors.len() + 1);
                errors.push(err);
            }
        }
    }

    Err(Failures { errors })
}

/// Runs `op` against every candidate and keeps all successes.
///
/// Succeeds as long as at least one candidate succeeded, returning
/// the successes together with the failures of the other candidates.
/// Fails with every accumulated error otherwise.
pub fn all_successes<C, T, E, I, F>(
    candidates: I,
    mut op: F,
) -> Result<(Vec<T>, Failures<E>), Failures<E>>
where
    I: IntoIterator<Item = C>,
    F: FnMut(C) -> Result<T, E>,
    E: fmt::Debug,
{
    let mut successes = Vec::new();
    let mut errors = Vec::new();

    for (i, candidate) in candidates.into_iter().enumerate() {
        match op(candidate) {
            Ok(out) => successes.push(out),
            Err(err) => {
                debug!(?err, "candidate #{} failed", i + 1);
                errors.push(err);
            }
        }
    }

    let failures = Failures { errors };

    if successes.is_empty() {
        Err(failures)
    } else {
        Ok((successes, failures))
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::{all_successes, first_success};

    fn fail(i: usize) -> io::Error {
        io::Error::new(io::ErrorKind::Other, format!("candidate {i} failed"))
    }

    #[test]
    fn first_success_whatever_the_position() {
        for k in 0..5 {
            let out = first_success(0..5, |i| if i == k { Ok(i * 10) } else { Err(fail(i)) });
            assert_eq!(out.unwrap(), k * 10);
        }
    }

    #[test]
    fn first_success_stops_at_first_success() {
        let mut tried = Vec::new();

        let out = first_success(0..5, |i| {
            tried.push(i);
            if i >= 1 {
                Ok(i)
            } else {
                Err(fail(i))
            }
        });

        assert_eq!(out.unwrap(), 1);
        assert_eq!(tried, vec![0, 1]);
    }

    #[test]
    fn first_success_reports_every_failure() {
        let failures = first_success(0..3, |i| Err::<(), _>(fail(i))).unwrap_err();

        assert_eq!(failures.len(), 3);
        assert_eq!(
            failures.causes(),
            "#1: candidate 0 failed; #2: candidate 1 failed; #3: candidate 2 failed"
        );
    }

    #[test]
    fn first_success_without_candidate() {
        let failures =
            first_success(Vec::<usize>::new(), |_| Ok::<_, io::Error>(())).unwrap_err();

        assert!(failures.is_empty());
        assert_eq!(failures.causes(), "no candidate to try");
    }

    #[test]
    fn all_successes_keeps_partial_successes() {
        let (successes, failures) =
            all_successes(0..3, |i| if i == 1 { Err(fail(i)) } else { Ok(i) }).unwrap();

        assert_eq!(successes, vec![0, 2]);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures.causes(), "#1: candidate 1 failed");
    }

    #[test]
    fn all_successes_fails_when_everything_fails() {
        let failures = all_successes(0..3, |i| Err::<(), _>(fail(i))).unwrap_err();

        assert_eq!(failures.len(), 3);
        assert!(failures.causes().starts_with("#1: candidate 0 failed; "));
    }
}
