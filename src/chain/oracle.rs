//! Commit-reveal randomness oracle (Switchboard On-Demand).
//!
//! The keeper never reads a revealed value. It only creates a randomness account and emits the
//! oracle's commit instruction next to the program's own `commit_randomness`.

use borsh::BorshSerialize;
use sha2::{Digest, Sha256};
use solana_sdk::address_lookup_table;
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::{system_program, sysvar};

pub const SWITCHBOARD_ON_DEMAND_MAINNET: Pubkey =
    pubkey!("SBondMDrcV3K4kxZR1HNVT7osZxAHVHgYXL5Ze1oMUv");
const SPL_TOKEN_PROGRAM: Pubkey = pubkey!("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA");
const ASSOCIATED_TOKEN_PROGRAM: Pubkey = pubkey!("ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL");
const WRAPPED_SOL_MINT: Pubkey = pubkey!("So11111111111111111111111111111111111111112");

const STATE_SEED: &[u8] = b"STATE";
const LUT_SIGNER_SEED: &[u8] = b"LutSigner";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OracleConfig {
    pub program_id: Pubkey,
    pub queue: Pubkey,
    pub oracle: Pubkey,
}

#[derive(BorshSerialize)]
struct RandomnessInitParams {
    recent_slot: u64,
}

fn ix_discriminator(name: &str) -> [u8; 8] {
    let digest = Sha256::digest(format!("global:{name}").as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[..8]);
    out
}

#[derive(Debug, Clone, Copy)]
pub struct SwitchboardOnDemand {
    config: OracleConfig,
}

impl SwitchboardOnDemand {
    pub fn new(config: OracleConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    fn program_state(&self) -> Pubkey {
        Pubkey::find_program_address(&[STATE_SEED], &self.config.program_id).0
    }

    fn lut_signer(&self, randomness: &Pubkey) -> Pubkey {
        Pubkey::find_program_address(&[LUT_SIGNER_SEED, randomness.as_ref()], &self.config.program_id).0
    }

    fn reward_escrow(randomness: &Pubkey) -> Pubkey {
        Pubkey::find_program_address(
            &[
                randomness.as_ref(),
                SPL_TOKEN_PROGRAM.as_ref(),
                WRAPPED_SOL_MINT.as_ref(),
            ],
            &ASSOCIATED_TOKEN_PROGRAM,
        )
        .0
    }

    /// Creates the randomness account. `randomness` and `authority` must both sign.
    pub fn randomness_init(&self, randomness: &Pubkey, authority: &Pubkey, recent_slot: u64) -> Instruction {
        let lut_signer = self.lut_signer(randomness);
        let (lut, _) =
            address_lookup_table::instruction::derive_lookup_table_address(&lut_signer, recent_slot);
        let mut data = ix_discriminator("randomness_init").to_vec();
        let _ = RandomnessInitParams { recent_slot }.serialize(&mut data);
        Instruction {
            program_id: self.config.program_id,
            accounts: vec![
                AccountMeta::new(*randomness, true),
                AccountMeta::new(Self::reward_escrow(randomness), false),
                AccountMeta::new_readonly(*authority, true),
                AccountMeta::new(self.config.queue, false),
                AccountMeta::new(*authority, true),
                AccountMeta::new_readonly(system_program::id(), false),
                AccountMeta::new_readonly(SPL_TOKEN_PROGRAM, false),
                AccountMeta::new_readonly(ASSOCIATED_TOKEN_PROGRAM, false),
                AccountMeta::new_readonly(WRAPPED_SOL_MINT, false),
                AccountMeta::new_readonly(self.program_state(), false),
                AccountMeta::new_readonly(lut_signer, false),
                AccountMeta::new(lut, false),
                AccountMeta::new_readonly(address_lookup_table::program::id(), false),
            ],
            data,
        }
    }

    /// Binds the randomness account to the next oracle reveal.
    pub fn randomness_commit(&self, randomness: &Pubkey, authority: &Pubkey) -> Instruction {
        Instruction {
            program_id: self.config.program_id,
            accounts: vec![
                AccountMeta::new(*randomness, false),
                AccountMeta::new_readonly(self.config.queue, false),
                AccountMeta::new(self.config.oracle, false),
                AccountMeta::new_readonly(sysvar::slot_hashes::id(), false),
                AccountMeta::new_readonly(*authority, true),
            ],
            data: ix_discriminator("randomness_commit").to_vec(),
        }
    }
}
