use draw_keeper::chain::memory::MemoryLedger;
use draw_keeper::chain::{DrawResult, ProgramState, Ticket};
use draw_keeper::draw::indexer::{index_draw, DEFAULT_PAGE_SIZE};
use draw_keeper::draw::{Game, GameRules};
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;
use solana_sdk::pubkey::Pubkey;
use std::time::Instant;

const PERF_BUDGET_MS: u128 = 1_500;
const BENCH_ROUNDS: usize = 7;
const TICKETS: usize = 20_000;
const DRAW_ID: u64 = 1;

fn median_ms(mut samples: Vec<u128>) -> u128 {
    if samples.is_empty() {
        return 0;
    }
    samples.sort_unstable();
    samples[samples.len() / 2]
}

fn random_numbers(rng: &mut StdRng, rules: &GameRules) -> Vec<u8> {
    sample(rng, usize::from(rules.pool_size), usize::from(rules.pick_count))
        .into_iter()
        .map(|i| i as u8 + 1)
        .collect()
}

fn seeded_ledger(rules: &GameRules) -> (MemoryLedger, DrawResult) {
    let mut rng = StdRng::seed_from_u64(0x00d1_5ea5);
    let ledger = MemoryLedger::new(
        rules.game,
        ProgramState {
            current_draw_id: DRAW_ID,
            is_draw_in_progress: true,
            is_funded: true,
            ..ProgramState::default()
        },
    );
    ledger.add_tickets((0..TICKETS).map(|_| Ticket {
        owner: Pubkey::new_unique(),
        draw_id: DRAW_ID,
        numbers: random_numbers(&mut rng, rules),
        is_claimed: false,
        match_count: 0,
        prize_amount: 0,
    }));
    let result = DrawResult {
        draw_id: DRAW_ID,
        winning_numbers: random_numbers(&mut rng, rules),
        total_tickets: TICKETS as u64,
        was_rolldown: false,
        is_explicitly_finalized: false,
    };
    (ledger, result)
}

fn main() {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(err) => {
            eprintln!("[BENCH][FAIL] failed to construct Tokio runtime: {err}");
            std::process::exit(1);
        }
    };

    for game in Game::ALL {
        let rules = GameRules::for_game(game);
        let (ledger, result) = seeded_ledger(&rules);
        let mut rounds = Vec::with_capacity(BENCH_ROUNDS);
        for round in 0..BENCH_ROUNDS {
            let started = Instant::now();
            let indexed = runtime.block_on(index_draw(
                &ledger,
                &rules,
                &result,
                round as u64,
                DEFAULT_PAGE_SIZE,
            ));
            let elapsed_ms = started.elapsed().as_millis();
            match indexed {
                Ok(index) if index.tickets_scanned == TICKETS as u64 => rounds.push(elapsed_ms),
                Ok(index) => {
                    eprintln!(
                        "[BENCH][FAIL] {} scanned {} of {} tickets",
                        game, index.tickets_scanned, TICKETS
                    );
                    std::process::exit(1);
                }
                Err(err) => {
                    eprintln!("[BENCH][FAIL] {} index failed: {err}", game);
                    std::process::exit(1);
                }
            }
        }

        let median = median_ms(rounds.clone());
        println!(
            "[BENCH] indexer_scan game={} tickets={} rounds_ms={:?} median_ms={} budget_ms={}",
            game, TICKETS, rounds, median, PERF_BUDGET_MS
        );
        if median > PERF_BUDGET_MS {
            eprintln!(
                "[BENCH][FAIL] {} index scan median {}ms exceeded {}ms budget",
                game, median, PERF_BUDGET_MS
            );
            std::process::exit(1);
        }
    }
    println!("[BENCH][PASS] indexer scan within {}ms budget", PERF_BUDGET_MS);
}
