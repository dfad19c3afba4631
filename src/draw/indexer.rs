//! Ticket indexer: paged scan, match counting, and the verification commitment.

use crate::chain::{DrawResult, LotteryProgram, Ticket};
use crate::draw::game::GameRules;
use crate::error::{ProtocolError, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};

pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Winner counts per prize tier, top tier first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WinnerCounts {
    top_tier: u8,
    counts: Vec<u32>,
}

impl WinnerCounts {
    pub fn empty(rules: &GameRules) -> Self {
        Self {
            top_tier: rules.pick_count,
            counts: vec![0; rules.tier_count()],
        }
    }

    fn slot(&self, tier: u8) -> Option<usize> {
        let offset = usize::from(self.top_tier.checked_sub(tier)?);
        (offset < self.counts.len()).then_some(offset)
    }

    /// Counts one ticket with `match_count` matches. Non-winning counts are ignored.
    pub fn record(&mut self, match_count: u8) -> bool {
        match self.slot(match_count) {
            Some(idx) => {
                self.counts[idx] = self.counts[idx].saturating_add(1);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, tier: u8) -> u32 {
        self.slot(tier).map_or(0, |idx| self.counts[idx])
    }

    pub fn set(&mut self, tier: u8, count: u32) {
        if let Some(idx) = self.slot(tier) {
            self.counts[idx] = count;
        }
    }

    /// `(tier, count)` pairs, top tier first.
    pub fn tiers(&self) -> impl Iterator<Item = (u8, u32)> + '_ {
        self.counts
            .iter()
            .enumerate()
            .map(|(offset, count)| (self.top_tier - offset as u8, *count))
    }

    pub fn total_winners(&self) -> u64 {
        self.counts.iter().map(|c| u64::from(*c)).sum()
    }

    /// Top tier first, each count as little-endian `u32`.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.counts.iter().flat_map(|c| c.to_le_bytes()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexResult {
    pub draw_id: u64,
    pub winner_counts: WinnerCounts,
    #[serde(serialize_with = "serialize_hash")]
    pub verification_hash: [u8; 32],
    pub nonce: u64,
    pub tickets_scanned: u64,
    /// Ticket count the program recorded at execute time.
    pub expected_tickets: u64,
}

impl IndexResult {
    pub fn is_complete(&self) -> bool {
        self.tickets_scanned == self.expected_tickets
    }
}

fn serialize_hash<S: serde::Serializer>(hash: &[u8; 32], s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(&hex::encode(hash))
}

pub fn count_matches(ticket: &[u8], winning: &[u8]) -> u8 {
    ticket
        .iter()
        .enumerate()
        .filter(|&(i, n)| winning.contains(n) && !ticket[..i].contains(n))
        .count() as u8
}

pub fn compute_verification_hash(
    draw_id: u64,
    winning_numbers: &[u8],
    counts: &WinnerCounts,
    nonce: u64,
) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(draw_id.to_le_bytes());
    hasher.update(winning_numbers);
    hasher.update(counts.to_bytes());
    hasher.update(nonce.to_le_bytes());
    hasher.finalize().into()
}

fn validate_winning_numbers(rules: &GameRules, result: &DrawResult) -> Result<()> {
    let malformed = |reason: String| ProtocolError::MalformedWinningNumbers {
        draw_id: result.draw_id,
        reason,
    };
    let numbers = &result.winning_numbers;
    if numbers.len() != usize::from(rules.pick_count) {
        return Err(malformed(format!(
            "expected {} numbers, got {}",
            rules.pick_count,
            numbers.len()
        ))
        .into());
    }
    if let Some(bad) = numbers.iter().find(|n| !rules.is_valid_number(**n)) {
        return Err(malformed(format!("{bad} outside 1..={}", rules.pool_size)).into());
    }
    let mut sorted = numbers.clone();
    sorted.sort_unstable();
    sorted.dedup();
    if sorted.len() != numbers.len() {
        return Err(malformed("duplicate numbers".to_string()).into());
    }
    Ok(())
}

/// Tallies one batch of tickets into `counts`. Returns how many tickets were counted.
pub fn tally(counts: &mut WinnerCounts, winning: &[u8], tickets: &[Ticket]) -> u64 {
    for ticket in tickets {
        counts.record(count_matches(&ticket.numbers, winning));
    }
    tickets.len() as u64
}

/// Scans every ticket of `result.draw_id` and builds the commitment for `finalize_draw`.
pub async fn index_draw<P: LotteryProgram + ?Sized>(
    program: &P,
    rules: &GameRules,
    result: &DrawResult,
    nonce: u64,
    page_size: usize,
) -> Result<IndexResult> {
    validate_winning_numbers(rules, result)?;
    let mut counts = WinnerCounts::empty(rules);
    let mut scanned = 0u64;
    let mut cursor = 0u64;
    let mut pages = 0u32;
    loop {
        let page = program
            .fetch_ticket_page(result.draw_id, cursor, page_size.max(1))
            .await?;
        scanned += tally(&mut counts, &result.winning_numbers, &page.tickets);
        pages += 1;
        match page.next_cursor {
            Some(next) if next > cursor => cursor = next,
            Some(next) => {
                tracing::warn!(
                    "[INDEX] {} draw {} cursor did not advance ({} -> {})",
                    rules.game,
                    result.draw_id,
                    cursor,
                    next
                );
                return Err(ProtocolError::ScanIncomplete {
                    draw_id: result.draw_id,
                    cursor,
                    scanned,
                }
                .into());
            }
            None => break,
        }
    }

    let verification_hash =
        compute_verification_hash(result.draw_id, &result.winning_numbers, &counts, nonce);
    tracing::info!(
        "[INDEX] {} draw {}: {} tickets over {} pages, {} winners, hash={}",
        rules.game,
        result.draw_id,
        scanned,
        pages,
        counts.total_winners(),
        hex::encode(verification_hash)
    );
    Ok(IndexResult {
        draw_id: result.draw_id,
        winner_counts: counts,
        verification_hash,
        nonce,
        tickets_scanned: scanned,
        expected_tickets: result.total_tickets,
    })
}
