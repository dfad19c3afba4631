/// Shrinks an RPC or program error into a single log-friendly line.
///
/// Solana simulation failures embed the full program log array; the keeper only needs the
/// leading error text, so the log block and any backtrace are dropped.
pub fn compact_error_message(message: &str, max_len: usize) -> String {
    let mut raw = message.to_string();
    if let Some((prefix, _)) = raw.split_once("Stack backtrace:") {
        raw = prefix.to_string();
    }
    if let Some((prefix, _)) = raw.split_once("logs: [") {
        raw = format!("{prefix}logs=<omitted>");
    }

    let mut compact = String::with_capacity(raw.len().min(max_len.saturating_add(16)));
    let mut prev_ws = false;
    for ch in raw.chars() {
        if ch.is_whitespace() {
            if !prev_ws && !compact.is_empty() {
                compact.push(' ');
            }
            prev_ws = true;
            continue;
        }
        compact.push(ch);
        prev_ws = false;
        if compact.len() > max_len {
            break;
        }
    }
    if compact.len() <= max_len {
        compact
    } else {
        let mut cut = max_len;
        while !compact.is_char_boundary(cut) {
            cut -= 1;
        }
        compact.truncate(cut);
        compact.push_str("...(truncated)");
        compact
    }
}

pub fn compact_error(err: impl std::fmt::Display) -> String {
    compact_error_message(&err.to_string(), 320)
}
