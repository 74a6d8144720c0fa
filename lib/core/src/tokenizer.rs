use crate::source::Tokenizer;
use crate::Result;

/// Segments text into runs of CJK ideographs and runs of other alphanumerics.
///
/// Whitespace and punctuation separate terms and are dropped. Case is kept;
/// callers that need case-insensitive terms lowercase them.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleTokenizer;

impl SimpleTokenizer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    pub fn tokenize(text: &str) -> Vec<String> {
        let mut terms = Vec::new();
        let mut current = String::new();
        let mut current_cjk = false;

        for c in text.chars() {
            if !c.is_alphanumeric() {
                flush(&mut current, &mut terms);
                continue;
            }
            let cjk = is_cjk(c);
            if cjk != current_cjk {
                flush(&mut current, &mut terms);
                current_cjk = cjk;
            }
            current.push(c);
        }
        flush(&mut current, &mut terms);
        terms
    }
}

impl Tokenizer for SimpleTokenizer {
    fn segment(&self, text: &str) -> Result<Vec<String>> {
        Ok(Self::tokenize(text))
    }
}

fn flush(current: &mut String, terms: &mut Vec<String>) {
    if !current.is_empty() {
        terms.push(std::mem::take(current));
    }
}

#[inline]
#[must_use]
pub fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{20000}'..='\u{2A6DF}')
}
