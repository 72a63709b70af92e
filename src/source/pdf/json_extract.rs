use serde_json::Value;

/// Fenced blocks first, then the whole reply, then each top-level `[` scanned to
/// its matching `]` with brackets inside JSON strings ignored.
pub fn extract_json_array(reply: &str) -> Vec<Value> {
    let reply = reply.trim();

    for block in fenced_blocks(reply) {
        if let Some(items) = parse_array(block) {
            return items;
        }
    }

    if let Some(items) = parse_array(reply) {
        return items;
    }

    // Brackets nested inside an already scanned candidate are not retried.
    let mut scanned_until = 0;
    for (start, _) in reply.match_indices('[') {
        if start < scanned_until {
            continue;
        }
        let Some(end) = matching_bracket(&reply[start..]) else {
            // Unbalanced from here on; every later bracket is nested inside it.
            break;
        };
        let candidate = &reply[start..start + end + 1];
        if let Some(items) = parse_array(candidate) {
            return items;
        }
        scanned_until = start + end + 1;
    }

    Vec::new()
}

fn parse_array(text: &str) -> Option<Vec<Value>> {
    let text = text.trim();
    if !text.starts_with('[') {
        return None;
    }
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Array(items)) => Some(items),
        _ => None,
    }
}

fn fenced_blocks(reply: &str) -> Vec<&str> {
    reply
        .split("```")
        .skip(1)
        .step_by(2)
        .map(|block| {
            let block = block.trim_start();
            block
                .strip_prefix("json")
                .or_else(|| block.strip_prefix("JSON"))
                .unwrap_or(block)
                .trim()
        })
        .collect()
}

fn matching_bracket(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, character) in text.char_indices() {
        if in_string {
            match character {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match character {
            '"' => in_string = true,
            '[' => depth += 1,
            ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(offset);
                }
            }
            _ => {}
        }
    }

    None
}
