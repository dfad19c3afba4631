//! Instruction encoders for the lottery programs (Anchor `global:` discriminators + Borsh args).

use crate::chain::accounts::{draw_result_address, state_address};
use crate::chain::FinalizeClaim;
use crate::draw::game::Game;
use borsh::BorshSerialize;
use sha2::{Digest, Sha256};
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::system_program;

pub const COMMIT_RANDOMNESS: &str = "commit_randomness";
pub const EXECUTE_DRAW: &str = "execute_draw";
pub const FINALIZE_DRAW: &str = "finalize_draw";
pub const CANCEL_DRAW: &str = "cancel_draw";
pub const FORCE_FINALIZE_DRAW: &str = "force_finalize_draw";

pub fn instruction_discriminator(name: &str) -> [u8; 8] {
    let digest = Sha256::digest(format!("global:{name}").as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[..8]);
    out
}

fn with_args<T: BorshSerialize>(name: &str, args: &T) -> Vec<u8> {
    let mut data = instruction_discriminator(name).to_vec();
    let _ = args.serialize(&mut data);
    data
}

/// Per-game handle that knows where the program and its PDAs live.
#[derive(Debug, Clone, Copy)]
pub struct LotteryInstructions {
    pub program_id: Pubkey,
    pub game: Game,
    pub authority: Pubkey,
}

impl LotteryInstructions {
    pub fn new(program_id: Pubkey, game: Game, authority: Pubkey) -> Self {
        Self {
            program_id,
            game,
            authority,
        }
    }

    pub fn state(&self) -> Pubkey {
        state_address(&self.program_id, self.game)
    }

    pub fn draw_result(&self, draw_id: u64) -> Pubkey {
        draw_result_address(&self.program_id, draw_id)
    }

    pub fn commit_randomness(&self, randomness: &Pubkey) -> Instruction {
        Instruction {
            program_id: self.program_id,
            accounts: vec![
                AccountMeta::new_readonly(self.authority, true),
                AccountMeta::new(self.state(), false),
                AccountMeta::new_readonly(*randomness, false),
            ],
            data: instruction_discriminator(COMMIT_RANDOMNESS).to_vec(),
        }
    }

    pub fn execute_draw(&self, draw_id: u64, randomness: &Pubkey) -> Instruction {
        Instruction {
            program_id: self.program_id,
            accounts: vec![
                AccountMeta::new(self.authority, true),
                AccountMeta::new(self.state(), false),
                AccountMeta::new(self.draw_result(draw_id), false),
                AccountMeta::new_readonly(*randomness, false),
                AccountMeta::new_readonly(system_program::id(), false),
            ],
            data: instruction_discriminator(EXECUTE_DRAW).to_vec(),
        }
    }

    /// Args: winner counts (top tier first, `u32` each), verification hash, nonce.
    pub fn finalize_draw(&self, claim: &FinalizeClaim) -> Instruction {
        let mut data = instruction_discriminator(FINALIZE_DRAW).to_vec();
        data.extend_from_slice(&claim.winner_counts.to_bytes());
        data.extend_from_slice(&claim.verification_hash);
        data.extend_from_slice(&claim.nonce.to_le_bytes());
        Instruction {
            program_id: self.program_id,
            accounts: vec![
                AccountMeta::new_readonly(self.authority, true),
                AccountMeta::new(self.state(), false),
                AccountMeta::new(self.draw_result(claim.draw_id), false),
            ],
            data,
        }
    }

    pub fn cancel_draw(&self, reason: &str) -> Instruction {
        Instruction {
            program_id: self.program_id,
            accounts: vec![
                AccountMeta::new_readonly(self.authority, true),
                AccountMeta::new(self.state(), false),
            ],
            data: with_args(CANCEL_DRAW, &reason.to_string()),
        }
    }

    pub fn force_finalize_draw(&self, draw_id: u64, reason: &str) -> Instruction {
        Instruction {
            program_id: self.program_id,
            accounts: vec![
                AccountMeta::new_readonly(self.authority, true),
                AccountMeta::new(self.state(), false),
                AccountMeta::new(self.draw_result(draw_id), false),
            ],
            data: with_args(FORCE_FINALIZE_DRAW, &reason.to_string()),
        }
    }
}
