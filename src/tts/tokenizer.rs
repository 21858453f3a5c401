use lazy_static::lazy_static;
use regex::Regex;

/// Longest piece of text the Google endpoint accepts in one request.
pub const MAX_CHUNK_CHARS: usize = 100;

lazy_static! {
    static ref SENTENCE_REGEX: Regex = Regex::new(
        r"(?x)
        [^.!?;:,\n…。、，！？]+        # Run of text
        [.!?;:,\n…。、，！？]*         # Trailing punctuation, kept with it
        "
    )
    .unwrap();
}

/// Split `text` into pieces of at most `max` characters.
///
/// Splits at punctuation first, then at whitespace, and hard-splits words
/// that are longer than `max`. Adjacent short pieces are merged back
/// together so the number of requests stays low.
pub fn chunk(text: &str, max: usize) -> Vec<String> {
    let mut pieces = Vec::new();

    for m in SENTENCE_REGEX.find_iter(text) {
        let segment = m.as_str().trim();
        if segment.is_empty() {
            continue;
        }
        if char_len(segment) <= max {
            pieces.push(segment.to_string());
        } else {
            split_words(segment, max, &mut pieces);
        }
    }

    merge(pieces, max)
}

fn split_words(segment: &str, max: usize, out: &mut Vec<String>) {
    let mut current = String::new();

    for word in segment.split_whitespace() {
        if char_len(word) > max {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            let chars: Vec<char> = word.chars().collect();
            for part in chars.chunks(max) {
                out.push(part.iter().collect());
            }
            continue;
        }

        let needed = if current.is_empty() {
            char_len(word)
        } else {
            char_len(&current) + 1 + char_len(word)
        };
        if needed > max {
            out.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }

    if !current.is_empty() {
        out.push(current);
    }
}

fn merge(pieces: Vec<String>, max: usize) -> Vec<String> {
    let mut merged: Vec<String> = Vec::new();

    for piece in pieces {
        match merged.last_mut() {
            Some(last) if char_len(last) + 1 + char_len(&piece) <= max => {
                last.push(' ');
                last.push_str(&piece);
            }
            _ => merged.push(piece),
        }
    }

    merged
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
