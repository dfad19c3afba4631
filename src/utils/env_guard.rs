use std::fs;
use std::path::Path;

const ENV_TEMPLATE: &str = r#"# Draw keeper configuration
SOLANA_RPC_URL="https://api.devnet.solana.com"
KEEPER_KEYPAIR_PATH="./keeper.json"
MAIN_PROGRAM_ID=""
QUICK_PICK_PROGRAM_ID=""
SWITCHBOARD_QUEUE=""
SWITCHBOARD_ORACLE=""

KEEPER_DRY_RUN="true"
RUST_LOG="info,draw_keeper=info"
"#;

/// Parses `KEY=value` lines. Quotes are stripped and trailing `#` comments dropped.
pub fn parse_env_file(content: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
        let Some((key, value)) = trimmed.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }

        let value = value.trim();
        let parsed = if value.len() >= 2
            && ((value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\'')))
        {
            &value[1..value.len() - 1]
        } else {
            value.split('#').next().unwrap_or("").trim()
        };
        pairs.push((key.to_string(), parsed.to_string()));
    }
    pairs
}

fn load_dot_env(path: &Path) {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("[ENV] Failed to read {}: {}", path.display(), e);
            return;
        }
    };
    for (key, value) in parse_env_file(&content) {
        // The real environment always wins.
        if std::env::var_os(&key).is_some() {
            continue;
        }
        std::env::set_var(key, value);
    }
}

/// Loads `.env` (never overriding variables already set) and drops a `.env.example`
/// template next to it on first run.
pub fn harden_env_setup() {
    let env_example = Path::new(".env.example");
    if !env_example.exists() {
        let _ = fs::write(env_example, ENV_TEMPLATE);
    }
    let env_path = Path::new(".env");
    if env_path.exists() {
        load_dot_env(env_path);
    }
    if std::env::var("SOLANA_RPC_URL").is_err() {
        eprintln!("[ENV] WARN: SOLANA_RPC_URL is not set");
    }
}
