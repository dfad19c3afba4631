//! Account layouts and PDA derivation for the lottery programs.
//!
//! Accounts are Anchor-encoded: an 8-byte `sha256("account:<Name>")` discriminator followed
//! by Borsh fields. Decoding reads the known prefix and ignores trailing padding so that
//! appended program fields do not break the keeper.

use crate::chain::{DrawResult, ProgramState, Ticket};
use crate::draw::game::Game;
use crate::error::{ChainError, Result};
use borsh::{BorshDeserialize, BorshSerialize};
use sha2::{Digest, Sha256};
use solana_sdk::pubkey::Pubkey;

pub const DISCRIMINATOR_LEN: usize = 8;
pub const LOTTERY_STATE_ACCOUNT: &str = "LotteryState";
pub const DRAW_RESULT_ACCOUNT: &str = "DrawResult";
pub const TICKET_ACCOUNT: &str = "Ticket";
pub const DRAW_RESULT_SEED: &[u8] = b"draw_result";
/// Byte offset of `Ticket::draw_id` (discriminator + owner).
pub const TICKET_DRAW_ID_OFFSET: usize = DISCRIMINATOR_LEN + 32;

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct LotteryStateAccount {
    pub authority: [u8; 32],
    pub current_draw_id: u64,
    pub jackpot_balance: u64,
    pub next_draw_timestamp: i64,
    pub commit_slot: u64,
    pub commit_timestamp: i64,
    pub current_randomness_account: [u8; 32],
    pub is_draw_in_progress: bool,
    pub is_paused: bool,
    pub is_funded: bool,
    pub bump: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct DrawResultAccount {
    pub draw_id: u64,
    pub winning_numbers: Vec<u8>,
    pub total_tickets: u64,
    pub was_rolldown: bool,
    pub is_explicitly_finalized: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct TicketAccount {
    pub owner: [u8; 32],
    pub draw_id: u64,
    pub numbers: Vec<u8>,
    pub is_claimed: bool,
    pub match_count: u8,
    pub prize_amount: u64,
}

impl From<LotteryStateAccount> for ProgramState {
    fn from(raw: LotteryStateAccount) -> Self {
        Self {
            authority: Pubkey::new_from_array(raw.authority),
            current_draw_id: raw.current_draw_id,
            jackpot_balance: raw.jackpot_balance,
            next_draw_timestamp: raw.next_draw_timestamp,
            commit_slot: raw.commit_slot,
            commit_timestamp: raw.commit_timestamp,
            current_randomness_account: Pubkey::new_from_array(raw.current_randomness_account),
            is_draw_in_progress: raw.is_draw_in_progress,
            is_paused: raw.is_paused,
            is_funded: raw.is_funded,
        }
    }
}

impl From<DrawResultAccount> for DrawResult {
    fn from(raw: DrawResultAccount) -> Self {
        Self {
            draw_id: raw.draw_id,
            winning_numbers: raw.winning_numbers,
            total_tickets: raw.total_tickets,
            was_rolldown: raw.was_rolldown,
            is_explicitly_finalized: raw.is_explicitly_finalized,
        }
    }
}

impl From<TicketAccount> for Ticket {
    fn from(raw: TicketAccount) -> Self {
        Self {
            owner: Pubkey::new_from_array(raw.owner),
            draw_id: raw.draw_id,
            numbers: raw.numbers,
            is_claimed: raw.is_claimed,
            match_count: raw.match_count,
            prize_amount: raw.prize_amount,
        }
    }
}

pub fn account_discriminator(name: &str) -> [u8; DISCRIMINATOR_LEN] {
    let digest = Sha256::digest(format!("account:{name}").as_bytes());
    let mut out = [0u8; DISCRIMINATOR_LEN];
    out.copy_from_slice(&digest[..DISCRIMINATOR_LEN]);
    out
}

pub fn decode_account<T: BorshDeserialize>(name: &str, address: &Pubkey, data: &[u8]) -> Result<T> {
    let decode_err = |reason: String| ChainError::AccountDecode {
        account: format!("{name}({address})"),
        reason,
    };
    if data.len() < DISCRIMINATOR_LEN {
        return Err(decode_err(format!("{} bytes is shorter than the discriminator", data.len())).into());
    }
    let (disc, mut body) = data.split_at(DISCRIMINATOR_LEN);
    if disc != account_discriminator(name) {
        return Err(decode_err(format!("discriminator mismatch: {}", hex::encode(disc))).into());
    }
    T::deserialize(&mut body).map_err(|err| decode_err(err.to_string()).into())
}

pub fn encode_account<T: BorshSerialize>(name: &str, value: &T) -> Vec<u8> {
    let mut out = account_discriminator(name).to_vec();
    // Writing into a Vec cannot fail.
    let _ = value.serialize(&mut out);
    out
}

pub fn state_address(program_id: &Pubkey, game: Game) -> Pubkey {
    Pubkey::find_program_address(&[game.state_seed()], program_id).0
}

pub fn draw_result_address(program_id: &Pubkey, draw_id: u64) -> Pubkey {
    Pubkey::find_program_address(&[DRAW_RESULT_SEED, &draw_id.to_le_bytes()], program_id).0
}
