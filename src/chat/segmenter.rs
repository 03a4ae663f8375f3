//! Splits assistant replies into chat bubbles.
//!
//! Line breaks always start a new bubble. Within a line the text is cut into
//! sentences, which are packed greedily up to the character budget. Two
//! clean-up passes follow: emoji-only bubbles stick to their neighbour, and a
//! bubble holding nothing but a list marker (`1.`, `2)`, `-`, `*`, `•`) is
//! joined to the bubble after it.

const SENTENCE_END: [char; 4] = ['.', '!', '?', '…'];

/// Splits `text` into bubbles of at most `budget` characters.
///
/// The merge passes may produce bubbles slightly over budget; a lone emoji or
/// list marker is never worth a bubble of its own.
pub fn segment(text: &str, budget: usize) -> Vec<String> {
    let budget = budget.max(1);
    let mut bubbles = Vec::new();
    for line in text.lines() {
        pack_line(line.trim(), budget, &mut bubbles);
    }
    let bubbles = merge_emoji(bubbles);
    let bubbles = merge_list_markers(bubbles);
    bubbles.into_iter().filter(|b| !b.trim().is_empty()).collect()
}

fn pack_line(line: &str, budget: usize, out: &mut Vec<String>) {
    let mut current = String::new();
    for sentence in sentences(line) {
        let len = sentence.chars().count();
        if len > budget {
            flush(&mut current, out);
            out.extend(split_long(sentence, budget));
        } else if current.is_empty() {
            current.push_str(sentence);
        } else if current.chars().count() + 1 + len <= budget {
            current.push(' ');
            current.push_str(sentence);
        } else {
            flush(&mut current, out);
            current.push_str(sentence);
        }
    }
    flush(&mut current, out);
}

fn flush(current: &mut String, out: &mut Vec<String>) {
    if !current.is_empty() {
        out.push(std::mem::take(current));
    }
}

/// Sentences end at a terminator that is followed by whitespace.
fn sentences(line: &str) -> Vec<&str> {
    let mut result = Vec::new();
    let mut start = 0;
    let mut chars = line.char_indices().peekable();
    while let Some((_, c)) = chars.next() {
        if !SENTENCE_END.contains(&c) {
            continue;
        }
        if let Some(&(next_idx, next)) = chars.peek() {
            if next.is_whitespace() {
                let sentence = line[start..next_idx].trim();
                if !sentence.is_empty() {
                    result.push(sentence);
                }
                start = next_idx;
            }
        }
    }
    let rest = line[start..].trim();
    if !rest.is_empty() {
        result.push(rest);
    }
    result
}

/// Cuts at the last whitespace within the budget, or hard-cuts when there is none.
fn split_long(sentence: &str, budget: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut rest: Vec<char> = sentence.chars().collect();
    while rest.len() > budget {
        let window = &rest[..=budget];
        let (chunk_end, next_start) = match window.iter().rposition(|c| c.is_whitespace()) {
            Some(pos) if pos > 0 => (pos, pos + 1),
            _ => (budget, budget),
        };
        let chunk: String = rest[..chunk_end].iter().collect();
        chunks.push(chunk.trim_end().to_string());
        rest = rest[next_start..].iter().copied().skip_while(|c| c.is_whitespace()).collect();
    }
    if !rest.is_empty() {
        chunks.push(rest.into_iter().collect());
    }
    chunks
}

fn merge_emoji(bubbles: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(bubbles.len());
    let mut leading = String::new();
    for bubble in bubbles {
        if is_emoji_only(&bubble) {
            match out.last_mut() {
                Some(prev) => {
                    prev.push(' ');
                    prev.push_str(bubble.trim());
                }
                None => {
                    if !leading.is_empty() {
                        leading.push(' ');
                    }
                    leading.push_str(bubble.trim());
                }
            }
        } else if leading.is_empty() {
            out.push(bubble);
        } else {
            out.push(format!("{} {bubble}", std::mem::take(&mut leading)));
        }
    }
    if !leading.is_empty() {
        out.push(leading);
    }
    out
}

fn merge_list_markers(bubbles: Vec<String>) -> Vec<String> {
    let mut out = Vec::with_capacity(bubbles.len());
    let mut marker: Option<String> = None;
    for bubble in bubbles {
        let bubble = match marker.take() {
            Some(m) => format!("{m} {bubble}"),
            None => bubble,
        };
        if is_list_marker(&bubble) {
            marker = Some(bubble);
        } else {
            out.push(bubble);
        }
    }
    // A trailing marker has nothing to attach to.
    out.extend(marker);
    out
}

fn is_list_marker(bubble: &str) -> bool {
    let s = bubble.trim();
    if matches!(s, "-" | "*" | "•") {
        return true;
    }
    match s.strip_suffix('.').or_else(|| s.strip_suffix(')')) {
        Some(number) => !number.is_empty() && number.chars().all(|c| c.is_ascii_digit()),
        None => false,
    }
}

fn is_emoji_only(bubble: &str) -> bool {
    let mut saw_emoji = false;
    for c in bubble.chars().filter(|c| !c.is_whitespace()) {
        if is_emoji_modifier(c) {
            continue;
        }
        if !is_emoji(c) {
            return false;
        }
        saw_emoji = true;
    }
    saw_emoji
}

fn is_emoji(c: char) -> bool {
    matches!(c as u32,
        0x1F000..=0x1FAFF
        | 0x2600..=0x27BF
        | 0x2B00..=0x2BFF
        | 0x2300..=0x23FF
        | 0x2190..=0x21FF
        | 0x25A0..=0x25FF
        | 0x3030 | 0x303D | 0x3297 | 0x3299
        | 0x00A9 | 0x00AE | 0x203C | 0x2049 | 0x2122 | 0x2139)
}

/// Joiners, variation selectors, keycaps and tag characters.
fn is_emoji_modifier(c: char) -> bool {
    matches!(c as u32, 0x200D | 0xFE0E | 0xFE0F | 0x20E3 | 0xE0020..=0xE007F)
}
