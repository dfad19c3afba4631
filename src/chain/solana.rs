//! Solana JSON-RPC implementation of [`LotteryProgram`].

use crate::chain::accounts::{
    account_discriminator, decode_account, DrawResultAccount, LotteryStateAccount, TicketAccount,
    DRAW_RESULT_ACCOUNT, LOTTERY_STATE_ACCOUNT, TICKET_ACCOUNT, TICKET_DRAW_ID_OFFSET,
};
use crate::chain::instructions::{
    LotteryInstructions, CANCEL_DRAW, COMMIT_RANDOMNESS, EXECUTE_DRAW, FINALIZE_DRAW,
    FORCE_FINALIZE_DRAW,
};
use crate::chain::oracle::SwitchboardOnDemand;
use crate::chain::{
    CommitReceipt, DrawResult, FinalizeClaim, LotteryProgram, ProgramState, Ticket, TicketPage,
};
use crate::draw::game::Game;
use crate::error::{ChainError, KeeperError, Result};
use crate::utils::error::compact_error;
use async_trait::async_trait;
use solana_account_decoder::{UiAccountEncoding, UiDataSliceConfig};
use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::{RpcAccountInfoConfig, RpcProgramAccountsConfig};
use solana_client::rpc_filter::{Memcmp, RpcFilterType};
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use solana_sdk::transaction::Transaction;
use std::sync::{Arc, Mutex};

/// `getMultipleAccounts` hard limit.
const MAX_MULTIPLE_ACCOUNTS: usize = 100;

const ORACLE_NOT_REVEALED_MARKERS: [&str; 3] =
    ["RandomnessNotResolved", "NotRevealed", "randomness not resolved"];

#[derive(Debug, Default)]
struct TicketScan {
    draw_id: u64,
    addresses: Vec<Pubkey>,
}

pub struct SolanaLotteryClient {
    rpc: Arc<RpcClient>,
    authority: Arc<Keypair>,
    instructions: LotteryInstructions,
    oracle: SwitchboardOnDemand,
    commitment: CommitmentConfig,
    scan: Mutex<Option<TicketScan>>,
}

impl SolanaLotteryClient {
    pub fn new(
        rpc: Arc<RpcClient>,
        authority: Arc<Keypair>,
        game: Game,
        program_id: Pubkey,
        oracle: SwitchboardOnDemand,
    ) -> Self {
        let commitment = rpc.commitment();
        Self {
            instructions: LotteryInstructions::new(program_id, game, authority.pubkey()),
            rpc,
            authority,
            oracle,
            commitment,
            scan: Mutex::new(None),
        }
    }

    pub fn program_id(&self) -> Pubkey {
        self.instructions.program_id
    }

    async fn fetch_raw(&self, address: &Pubkey) -> Result<Option<Vec<u8>>> {
        let response = self
            .rpc
            .get_account_with_commitment(address, self.commitment)
            .await
            .map_err(|err| classify_client_error("get_account", &err))?;
        Ok(response.value.map(|account| account.data))
    }

    /// Ticket addresses for `draw_id`, sorted so page cursors are stable within a scan.
    async fn list_ticket_addresses(&self, draw_id: u64) -> Result<Vec<Pubkey>> {
        let config = RpcProgramAccountsConfig {
            filters: Some(vec![
                RpcFilterType::Memcmp(Memcmp::new_base58_encoded(
                    0,
                    &account_discriminator(TICKET_ACCOUNT),
                )),
                RpcFilterType::Memcmp(Memcmp::new_base58_encoded(
                    TICKET_DRAW_ID_OFFSET,
                    &draw_id.to_le_bytes(),
                )),
            ]),
            account_config: RpcAccountInfoConfig {
                encoding: Some(UiAccountEncoding::Base64),
                data_slice: Some(UiDataSliceConfig {
                    offset: 0,
                    length: 0,
                }),
                commitment: Some(self.commitment),
                ..Default::default()
            },
            ..Default::default()
        };
        let accounts = self
            .rpc
            .get_program_accounts_with_config(&self.program_id(), config)
            .await
            .map_err(|err| classify_client_error("get_program_accounts", &err))?;
        let mut addresses: Vec<Pubkey> = accounts.into_iter().map(|(address, _)| address).collect();
        addresses.sort_unstable();
        tracing::debug!(
            "[RPC] {} draw {} ticket listing: {} accounts",
            self.game(),
            draw_id,
            addresses.len()
        );
        Ok(addresses)
    }

    fn cached_page(&self, draw_id: u64, start: usize, end_hint: usize) -> Option<(Vec<Pubkey>, usize)> {
        let guard = self.scan.lock().ok()?;
        let scan = guard.as_ref().filter(|scan| scan.draw_id == draw_id)?;
        let end = end_hint.min(scan.addresses.len());
        let page = scan.addresses.get(start..end).map(<[Pubkey]>::to_vec).unwrap_or_default();
        Some((page, scan.addresses.len()))
    }

    fn store_scan(&self, draw_id: u64, addresses: Vec<Pubkey>) {
        if let Ok(mut guard) = self.scan.lock() {
            *guard = Some(TicketScan { draw_id, addresses });
        }
    }

    async fn submit(
        &self,
        instruction: &'static str,
        ixs: &[Instruction],
        extra_signer: Option<&Keypair>,
    ) -> Result<String> {
        let blockhash = self
            .rpc
            .get_latest_blockhash()
            .await
            .map_err(|err| classify_client_error(instruction, &err))?;
        let payer = self.authority.pubkey();
        let mut signers: Vec<&Keypair> = vec![self.authority.as_ref()];
        if let Some(extra) = extra_signer {
            signers.push(extra);
        }
        let tx = Transaction::new_signed_with_payer(ixs, Some(&payer), signers.as_slice(), blockhash);
        let signature = self
            .rpc
            .send_and_confirm_transaction(&tx)
            .await
            .map_err(|err| classify_client_error(instruction, &err))?;
        tracing::info!("[RPC] {} {} landed: {}", self.game(), instruction, signature);
        Ok(signature.to_string())
    }
}

fn classify_client_error(instruction: &'static str, err: &ClientError) -> KeeperError {
    let message = compact_error(err);
    if ORACLE_NOT_REVEALED_MARKERS
        .iter()
        .any(|marker| message.contains(marker))
    {
        return ChainError::OracleNotRevealed(message).into();
    }
    match err.kind() {
        ClientErrorKind::TransactionError(_) => ChainError::Rejected {
            instruction,
            message,
        }
        .into(),
        ClientErrorKind::RpcError(_) if message.contains("custom program error") => {
            ChainError::Rejected {
                instruction,
                message,
            }
            .into()
        }
        _ => ChainError::Transport(message).into(),
    }
}

#[async_trait]
impl LotteryProgram for SolanaLotteryClient {
    fn game(&self) -> Game {
        self.instructions.game
    }

    async fn fetch_state(&self) -> Result<ProgramState> {
        let address = self.instructions.state();
        let data = self
            .fetch_raw(&address)
            .await?
            .ok_or_else(|| ChainError::AccountMissing(format!("{LOTTERY_STATE_ACCOUNT}({address})")))?;
        let raw: LotteryStateAccount = decode_account(LOTTERY_STATE_ACCOUNT, &address, &data)?;
        Ok(raw.into())
    }

    async fn fetch_draw_result(&self, draw_id: u64) -> Result<Option<DrawResult>> {
        let address = self.instructions.draw_result(draw_id);
        match self.fetch_raw(&address).await? {
            None => Ok(None),
            Some(data) => {
                let raw: DrawResultAccount = decode_account(DRAW_RESULT_ACCOUNT, &address, &data)?;
                Ok(Some(raw.into()))
            }
        }
    }

    async fn fetch_ticket_page(&self, draw_id: u64, cursor: u64, limit: usize) -> Result<TicketPage> {
        let start = usize::try_from(cursor).unwrap_or(usize::MAX);
        let limit = limit.clamp(1, MAX_MULTIPLE_ACCOUNTS);
        let end_hint = start.saturating_add(limit);

        // Cursor 0 starts a fresh scan; later cursors reuse the listing taken at cursor 0.
        let cached = if cursor == 0 {
            None
        } else {
            self.cached_page(draw_id, start, end_hint)
        };
        let (addresses, total) = match cached {
            Some(hit) => hit,
            None => {
                let listing = self.list_ticket_addresses(draw_id).await?;
                let total = listing.len();
                let page = listing
                    .get(start.min(total)..end_hint.min(total))
                    .map(<[Pubkey]>::to_vec)
                    .unwrap_or_default();
                self.store_scan(draw_id, listing);
                (page, total)
            }
        };

        let mut tickets = Vec::with_capacity(addresses.len());
        if !addresses.is_empty() {
            let accounts = self
                .rpc
                .get_multiple_accounts_with_commitment(&addresses, self.commitment)
                .await
                .map_err(|err| classify_client_error("get_multiple_accounts", &err))?
                .value;
            for (address, account) in addresses.iter().zip(accounts) {
                // Closed between listing and fetch.
                let Some(account) = account else {
                    tracing::warn!("[RPC] ticket {} vanished mid-scan", address);
                    continue;
                };
                let raw: TicketAccount = decode_account(TICKET_ACCOUNT, address, &account.data)?;
                if raw.draw_id == draw_id {
                    tickets.push(Ticket::from(raw));
                }
            }
        }

        let consumed = start.saturating_add(addresses.len());
        let next_cursor = (consumed < total).then_some(consumed as u64);
        Ok(TicketPage {
            tickets,
            next_cursor,
        })
    }

    async fn commit_randomness(&self) -> Result<CommitReceipt> {
        let randomness = Keypair::new();
        let authority = self.authority.pubkey();
        let recent_slot = self
            .rpc
            .get_slot()
            .await
            .map_err(|err| classify_client_error("get_slot", &err))?;

        let init = self
            .oracle
            .randomness_init(&randomness.pubkey(), &authority, recent_slot);
        self.submit("randomness_init", &[init], Some(&randomness))
            .await?;

        let commit = [
            self.oracle.randomness_commit(&randomness.pubkey(), &authority),
            self.instructions.commit_randomness(&randomness.pubkey()),
        ];
        let signature = self.submit(COMMIT_RANDOMNESS, &commit, None).await?;
        let state = self.fetch_state().await?;
        Ok(CommitReceipt {
            signature,
            randomness_account: randomness.pubkey(),
            commit_slot: state.commit_slot,
        })
    }

    async fn execute_draw(&self, draw_id: u64) -> Result<String> {
        let state = self.fetch_state().await?;
        if state.current_draw_id != draw_id {
            return Err(ChainError::Rejected {
                instruction: EXECUTE_DRAW,
                message: format!(
                    "draw {draw_id} is not current (chain at {})",
                    state.current_draw_id
                ),
            }
            .into());
        }
        let ix = self
            .instructions
            .execute_draw(draw_id, &state.current_randomness_account);
        self.submit(EXECUTE_DRAW, &[ix], None).await
    }

    async fn finalize_draw(&self, claim: &FinalizeClaim) -> Result<String> {
        let ix = self.instructions.finalize_draw(claim);
        self.submit(FINALIZE_DRAW, &[ix], None).await
    }

    async fn cancel_draw(&self, draw_id: u64, reason: &str) -> Result<String> {
        tracing::warn!("[RPC] {} cancelling draw {}: {}", self.game(), draw_id, reason);
        let ix = self.instructions.cancel_draw(reason);
        self.submit(CANCEL_DRAW, &[ix], None).await
    }

    async fn force_finalize_draw(&self, draw_id: u64, reason: &str) -> Result<String> {
        let ix = self.instructions.force_finalize_draw(draw_id, reason);
        self.submit(FORCE_FINALIZE_DRAW, &[ix], None).await
    }
}
