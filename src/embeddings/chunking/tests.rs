use super::*;

/// Length of the longest suffix of `a` that is also a prefix of `b`
fn overlap_len(a: &str, b: &str) -> usize {
    (1..=a.len().min(b.len()))
        .rev()
        .find(|&k| b.is_char_boundary(k) && a.ends_with(&b[..k]))
        .unwrap_or(0)
}

#[test]
fn default_constants() {
    let splitter = TextSplitter::default();
    assert_eq!(splitter.chunk_size(), 1000);
    assert_eq!(splitter.chunk_overlap(), 200);
}

#[test]
fn short_text_is_one_trimmed_chunk() {
    let chunks = TextSplitter::default().split("  hello world  ");

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].content, "hello world");
    assert_eq!(chunks[0].chunk_index, 0);
    assert_eq!(chunks[0].start_offset, 2);
}

#[test]
fn empty_and_blank_text_produce_nothing() {
    let splitter = TextSplitter::default();
    assert!(splitter.split("").is_empty());
    assert!(splitter.split(" \n\n \n  ").is_empty());
}

#[test]
fn paragraphs_are_kept_whole() {
    let paragraphs: Vec<String> = ['a', 'b', 'c', 'd', 'e']
        .iter()
        .map(|c| c.to_string().repeat(300))
        .collect();
    let text = paragraphs.join("\n\n");

    let chunks = TextSplitter::default().split(&text);

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].content, paragraphs[..3].join("\n\n"));
    assert_eq!(chunks[1].content, paragraphs[3..].join("\n\n"));
    assert_eq!(chunks[0].start_offset, 0);
    assert_eq!(chunks[1].start_offset, 906);
    assert_eq!(chunks[1].chunk_index, 1);
}

#[test]
fn word_chunks_respect_size_and_overlap() {
    let text = (0..400)
        .map(|i| format!("word{:03}", i))
        .collect::<Vec<_>>()
        .join(" ");

    let chunks = TextSplitter::default().split(&text);

    assert!(chunks.len() >= 3, "expected several chunks, got {}", chunks.len());
    for chunk in &chunks {
        assert!(chunk.content.chars().count() <= CHUNK_SIZE);
        assert_eq!(&text[chunk.start_offset..chunk.start_offset + chunk.content.len()], chunk.content);
    }
    for pair in chunks.windows(2) {
        let overlap = overlap_len(&pair[0].content, &pair[1].content);
        assert!(overlap > 0, "adjacent chunks should share text");
        assert!(overlap <= CHUNK_OVERLAP, "overlap {} too large", overlap);
        assert!(pair[1].start_offset > pair[0].start_offset);
    }
}

#[test]
fn long_paragraph_falls_back_to_lines() {
    let lines: Vec<String> = (0..30)
        .map(|i| format!("line {:02} {}", i, "-".repeat(50)))
        .collect();
    let text = format!("intro\n\n{}", lines.join("\n"));

    let chunks = TextSplitter::default().split_text(&text);

    assert_eq!(chunks[0], "intro");
    assert!(chunks.len() >= 3);
    for chunk in &chunks[1..] {
        assert!(chunk.starts_with("line "), "chunk split mid-line: {:?}", chunk);
        assert!(chunk.chars().count() <= CHUNK_SIZE);
    }
}

#[test]
fn unbroken_text_falls_back_to_characters() {
    let text = "x".repeat(2500);

    let chunks = TextSplitter::default().split_text(&text);
    let lengths: Vec<usize> = chunks.iter().map(String::len).collect();

    assert_eq!(lengths, vec![1000, 1000, 900]);
}

#[test]
fn lengths_count_characters_not_bytes() {
    let text = "é".repeat(1500);

    let chunks = TextSplitter::default().split_text(&text);
    let lengths: Vec<usize> = chunks.iter().map(|c| c.chars().count()).collect();

    assert_eq!(lengths, vec![1000, 700]);
}

#[test]
fn custom_sizes() {
    let splitter = TextSplitter::new(20, 5);
    let chunks = splitter.split_text("alpha beta gamma delta epsilon zeta eta theta");

    assert!(chunks.len() > 1);
    assert!(chunks.iter().all(|c| c.chars().count() <= 20));
}

#[test]
#[should_panic(expected = "must be smaller than chunk size")]
fn overlap_must_be_smaller_than_size() {
    let _ = TextSplitter::new(100, 100);
}
