//! Human-readable code allocation for books that lack one.
//!
//! Uniqueness cannot be decided from a snapshot alone, so every candidate is
//! probed against the store. Codes handed out earlier in the same planning
//! pass are remembered and treated as taken without a probe.
//!
//! Two concurrent planning passes can still pick the same code between probe
//! and write; nothing here detects that.

use rand::Rng;
use std::collections::HashSet;

use super::error::ReconcileError;
use crate::domain::InventoryGateway;

/// Numbered variants tried after the bare base code.
pub const MAX_CODE_PROBES: u32 = 999;

/// Random `BK` codes tried once the numbered variants are used up.
pub const MAX_FALLBACK_ATTEMPTS: u32 = 100;

const FALLBACK_PREFIX: &str = "BK";
const FALLBACK_SUFFIX_LEN: usize = 6;
const BASE36: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// First three ASCII letters of the title, uppercased.
/// `BK` when the title has fewer than two usable letters.
pub fn base_code(title: &str) -> String {
    let letters: String = title
        .chars()
        .filter(char::is_ascii_alphabetic)
        .take(3)
        .map(|c| c.to_ascii_uppercase())
        .collect();

    if letters.len() < 2 {
        FALLBACK_PREFIX.to_string()
    } else {
        letters
    }
}

/// Random uppercase base-36 string.
pub fn random_base36(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect()
}

pub struct CodeAllocator<'a, G: ?Sized> {
    gateway: &'a G,
    reserved: HashSet<String>,
}

impl<'a, G> CodeAllocator<'a, G>
where
    G: InventoryGateway + ?Sized,
{
    pub fn new(gateway: &'a G) -> Self {
        Self {
            gateway,
            reserved: HashSet::new(),
        }
    }

    /// Codes handed out so far.
    pub fn reserved(&self) -> &HashSet<String> {
        &self.reserved
    }

    async fn is_taken(&self, candidate: &str) -> Result<bool, ReconcileError> {
        if self.reserved.contains(candidate) {
            return Ok(true);
        }
        let existing = self
            .gateway
            .find_book_by_code(candidate)
            .await
            .map_err(ReconcileError::CodeProbe)?;
        Ok(existing.is_some())
    }

    fn claim(&mut self, code: String) -> String {
        self.reserved.insert(code.clone());
        code
    }

    /// Return the first free code for a book with this title.
    ///
    /// Tries `BASE`, then `BASE001` through `BASE999`, then gives up on the
    /// title and returns `BK` followed by six random base-36 characters. Random
    /// codes are checked against the store like every other candidate.
    pub async fn allocate(&mut self, title: &str) -> Result<String, ReconcileError> {
        let base = base_code(title);

        if !self.is_taken(&base).await? {
            return Ok(self.claim(base));
        }

        for n in 1..=MAX_CODE_PROBES {
            let candidate = format!("{}{:03}", base, n);
            if !self.is_taken(&candidate).await? {
                return Ok(self.claim(candidate));
            }
        }

        for _ in 0..MAX_FALLBACK_ATTEMPTS {
            let fallback = format!("{}{}", FALLBACK_PREFIX, random_base36(FALLBACK_SUFFIX_LEN));
            if self.is_taken(&fallback).await? {
                continue;
            }
            tracing::warn!(
                "Code space for base '{}' exhausted after {} probes, using random code {}",
                base,
                MAX_CODE_PROBES,
                fallback
            );
            return Ok(self.claim(fallback));
        }

        Err(ReconcileError::CodeSpaceExhausted(base))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_code_takes_first_three_letters() {
        assert_eq!(base_code("Atlas of Kenya"), "ATL");
        assert_eq!(base_code("1984: a novel"), "ANO");
        assert_eq!(base_code("it"), "IT");
    }

    #[test]
    fn test_base_code_falls_back_when_too_few_letters() {
        assert_eq!(base_code("1984"), "BK");
        assert_eq!(base_code("X"), "BK");
        assert_eq!(base_code(""), "BK");
    }

    #[test]
    fn test_random_base36_alphabet() {
        let code = random_base36(6);
        assert_eq!(code.len(), 6);
        assert!(
            code.chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
        );
    }
}
