//! Splits long document text into overlapping chunks for the semantic index.

pub const DEFAULT_CHUNK_SIZE: usize = 500;
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;

/// Splits `text` into chunks of at most `chunk_size` characters, each sharing up to
/// `overlap` characters with its predecessor. Chunks end on whitespace where possible.
pub fn split_document(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let chunk_size = chunk_size.max(2);
    let overlap = overlap.min(chunk_size / 2);

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let mut end = (start + chunk_size).min(chars.len());
        if end < chars.len() {
            if let Some(ws) = chars[start..end].iter().rposition(|c| c.is_whitespace()) {
                if ws > overlap {
                    end = start + ws;
                }
            }
        }

        let chunk: String = chars[start..end].iter().collect();
        let chunk = chunk.trim();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }

        if end >= chars.len() {
            break;
        }
        start = end.saturating_sub(overlap).max(start + 1);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunks = split_document("Certified Kubernetes Administrator", 500, 50);
        assert_eq!(chunks, vec!["Certified Kubernetes Administrator"]);
    }

    #[test]
    fn test_blank_text_has_no_chunks() {
        assert!(split_document("   \n\t ", 500, 50).is_empty());
    }

    #[test]
    fn test_long_text_respects_chunk_size() {
        let text = "engineering leadership ".repeat(100);
        let chunks = split_document(&text, 500, 50);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 500));
    }

    #[test]
    fn test_consecutive_chunks_overlap() {
        let text = (0..200).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");
        let chunks = split_document(&text, 100, 20);
        let first_tail: Vec<&str> = chunks[0].split_whitespace().rev().take(2).collect();
        assert!(first_tail.iter().any(|w| chunks[1].contains(w)));
    }

    #[test]
    fn test_multibyte_text_is_split_on_char_boundaries() {
        let text = "Führungserfahrung ".repeat(60);
        let chunks = split_document(&text, 120, 20);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 120));
    }
}
